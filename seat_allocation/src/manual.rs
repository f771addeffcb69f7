/*!

This is the long-form manual for `seat_allocation` and `lgseats`.

## The allocation formula

Each district elects a fixed number of members. The seats are allocated from the
party vote counts of the district, in the following order:

1. **Threshold.** A party needs at least 5% of the valid votes (rounded down) to
   get any seat. The other parties are listed as disqualified.
2. **Bonus seat.** One seat is reserved for the qualified party with the most votes.
   When two parties have the same number of votes, the party entered first wins.
3. **First round.** The remaining seats (all the seats minus the bonus seat) define
   the quota: `valid votes / remaining seats`. Each qualified party gets
   `floor(votes / quota)` seats. The quota is based on all the valid votes, including
   the votes of the disqualified parties.
4. **Second round.** The seats that the first round did not hand out go to the
   parties with the largest remainders (`votes - first round seats * quota`), one
   seat per party at most. Ties follow the input order.

If the second round has more seats than qualified parties, the extra seats are not
assigned. This does not happen with consistent data; the outcome reports these seats
in `unassigned_seats` and a warning is logged.

### Example

A district with 5 seats, 100,000 valid votes and three parties: A 60,000, B 30,000,
C 10,000.

| Party | Votes  | First round | Second round | Bonus | Total |
|-------|--------|-------------|--------------|-------|-------|
| A     | 60,000 | 2           | 1            | 1     | 4     |
| B     | 30,000 | 1           | 0            | 0     | 1     |
| C     | 10,000 | 0           | 0            | 0     | 0     |

The threshold is 5,000 votes and the quota is 25,000 votes. A and C have the same
remainder (10,000): A is listed first and gets the second round seat.

## Threshold rounding

The default rule compares the votes to the floored threshold. The `exact` rounding
compares them to the untruncated share instead: with 100,010 valid votes, a party with
5,000 votes qualifies under the default rule but not under the `exact` rule, which
requires 5,001 votes.

## Configuration

`lgseats` reads a JSON file:

```json
{
  "outputSettings": { "contestName": "Local authorities 2025", "contestDate": "2025-05-06" },
  "year": 2025,
  "parties": [
    { "id": "unp", "name": "United National Party", "shortName": "UNP", "color": "#909d54" }
  ],
  "provinces": [
    { "id": "western", "name": "Western Province",
      "districts": [ { "id": "colombo", "name": "Colombo", "seatAllocation": 19 } ] }
  ],
  "districtResults": [
    { "districtId": "colombo", "totalVotes": 950000, "invalidVotes": 21000,
      "partyVotes": [ { "partyId": "unp", "votes": 400000 } ] }
  ],
  "tallySources": [
    { "provider": "csv", "filePath": "western.csv", "districtColumnIndex": 1,
      "partyColumnIndex": 2, "votesColumnIndex": 3, "firstVoteRowIndex": 2 }
  ],
  "rules": { "thresholdPercent": 5, "thresholdRounding": "floor" }
}
```

* `districtResults` records the totals of each district. The valid votes are taken
  from `validVotes` when present, otherwise they are the total votes minus the invalid
  votes. With `"estimateInvalidVotes": true` in the rules, a district with no recorded
  invalid votes is assumed to have 5% of its total votes invalid.
* `tallySources` are CSV (`csv`) or Excel (`xlsx`) files with one party per row. Column
  indexes start at 1 and may also be given as spreadsheet letters (`"C"`). A file that
  only contains one district may omit the district column and set `districtId`
  instead. `excelWorksheetName` selects the worksheet of an Excel file.

Run it with:

```bash
lgseats --config election.json --out summary.json
```

`--reference expected_summary.json` compares the summary with a reference file and
prints the differences. `--district colombo` restricts the run to one district.

*/
