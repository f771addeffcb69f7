use clap::Parser;

/// This is a seat allocation program for local-government elections.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the election data in JSON format: parties, provinces,
    /// districts, district totals and the tally files to read.
    /// See the manual of the seat_allocation crate for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, lgseats will
    /// check that the calculated summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (number) The election year to calculate. Overrides the year of the configuration.
    #[clap(long, value_parser)]
    pub year: Option<u32>,

    /// (district id) If specified, only this district is calculated.
    #[clap(long, value_parser)]
    pub district: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
