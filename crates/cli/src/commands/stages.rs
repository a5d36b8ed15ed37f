//! Stage Listing

use clap::Args;
use serde::Serialize;

use lmsprobe_e2e::{Group, Sequencer};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct StagesArgs {
    /// Only list stages of this group
    #[arg(long, value_parser = super::run::parse_group)]
    pub group: Option<Group>,
}

/// One pipeline stage, as listed
#[derive(Debug, Serialize)]
pub struct StageDisplay {
    pub position: usize,
    pub group: String,
    pub name: String,
}

impl TableDisplay for StageDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Group", "Stage"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.position.to_string(), self.group.clone(), self.name.clone()]
    }
}

pub fn collect(group: Option<Group>) -> Vec<StageDisplay> {
    Sequencer::standard()
        .stages()
        .iter()
        .enumerate()
        .filter(|(_, stage)| group.map_or(true, |g| stage.group == g))
        .map(|(index, stage)| StageDisplay {
            position: index + 1,
            group: stage.group.key().to_string(),
            name: stage.name.to_string(),
        })
        .collect()
}

pub fn execute(args: StagesArgs, format: OutputFormat) {
    print_list(&collect(args.group), format);
}
