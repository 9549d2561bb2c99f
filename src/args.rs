use clap::Parser;

/// This is an election tabulation program: plurality, Schulze, encrypted ballots and audit plans.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the election data, in JSON format.
    /// For more information about the file format, read the manual of the vote_tally crate.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, votetally will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. By default it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (integer) Seed of the random generator used by the noised counts. Overrides the `randomSeed` rule of the
    /// election file. Without any seed, every run draws different noise.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
