use clap::Parser;

/// Consolidates the PVs (procès-verbaux) of the polling bureaus of an election.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON dataset describing the elections, the candidates, the voting centers
    /// and the PV sheets to read. See the documentation of the pv_results crate for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference summary in JSON format. If provided, ewana checks that the
    /// computed summary matches it and fails otherwise.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the summary. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (election, commune, department, center:<id> or bureau:<id>) The scope of the results.
    /// Overrides the scope of the dataset.
    #[clap(short, long, value_parser)]
    pub scope: Option<String>,

    /// (confirmed or entered) Whether tallies still waiting for review are counted.
    #[clap(long, value_parser)]
    pub counting: Option<String>,

    /// If passed as an argument, projects the bureaus that have not reported with the
    /// simulation block of the dataset.
    #[clap(long, takes_value = false)]
    pub simulate: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
