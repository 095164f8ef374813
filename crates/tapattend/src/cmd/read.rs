use tapattend_frame::{decode_record, FrameError};
use tapattend_transport::BlockLayout;
use tracing::debug;

use crate::backend;
use crate::cmd::ReadArgs;
use crate::exit::{frame_error, transport_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_raw, print_read, OutputFormat, ReadOutput};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = backend::open(&args.reader, BlockLayout::default())?;
    let data = session
        .read_record()
        .map_err(|err| transport_error("read failed", err))?;

    if matches!(format, OutputFormat::Raw) {
        print_raw(&data);
        return Ok(SUCCESS);
    }

    let uid = match session.read_uid() {
        Ok(uid) => Some(uid),
        Err(err) => {
            debug!(%err, "tag UID unavailable");
            None
        }
    };
    session.disconnect();

    let (profile, code) = match decode_record(&data) {
        Ok(profile) => (Some(profile), SUCCESS),
        Err(FrameError::NoIdentifier) => (None, FAILURE),
        Err(err) => return Err(frame_error("decode failed", err)),
    };

    let out = ReadOutput {
        reader: session.reader_name().to_string(),
        uid,
        profile,
    };
    print_read(&out, format);
    Ok(code)
}
