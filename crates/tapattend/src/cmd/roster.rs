use crate::cmd::RosterArgs;
use crate::exit::{roster_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_roster, OutputFormat};
use crate::roster::load_roster;

pub fn run(args: RosterArgs, format: OutputFormat) -> CliResult<i32> {
    let roster = load_roster(&args.roster).map_err(|err| roster_error("roster load failed", err))?;

    let Some(cin) = args.search.as_deref().map(str::trim) else {
        print_roster(roster.rows(), format);
        return Ok(SUCCESS);
    };

    match roster.find(cin) {
        Some(found) => {
            print_roster(roster.rows().filter(|(row, _)| *row == found), format);
            Ok(SUCCESS)
        }
        None => {
            eprintln!("CIN {cin} not found in roster");
            Ok(FAILURE)
        }
    }
}
