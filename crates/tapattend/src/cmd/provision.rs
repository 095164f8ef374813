use bytes::BytesMut;
use tapattend_frame::{encode_record, RecordConfig};
use tapattend_session::Roster;
use tapattend_transport::BlockLayout;
use tracing::info;

use crate::backend;
use crate::cmd::ProvisionArgs;
use crate::exit::{frame_error, roster_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_provisioned, OutputFormat};
use crate::roster::load_roster;

pub fn run(args: ProvisionArgs, format: OutputFormat) -> CliResult<i32> {
    let roster = load_roster(&args.roster).map_err(|err| roster_error("roster load failed", err))?;
    let profile = roster
        .row(args.row)
        .map_err(|err| roster_error("roster lookup failed", err))?;

    // An oversized row is rejected before any block is written.
    let mut buf = BytesMut::new();
    encode_record(&profile, &RecordConfig::default(), &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;

    let mut session = backend::open(&args.reader, BlockLayout::default())?;
    let blocks = session
        .write_record(&buf)
        .map_err(|err| transport_error("write failed (tag may be partially written)", err))?;
    session.disconnect();

    info!(row = args.row, identifier = %profile.identifier, blocks, "provisioned tag");
    print_provisioned(args.row, &profile, blocks, format);
    Ok(SUCCESS)
}
