use std::path::PathBuf;

use clap::Args;
use tapattend_transport::{open_session, BlockLayout, CardReader, ImageBackend, TagSession};

use crate::exit::{transport_error, CliResult};

/// Reader selection shared by every command that touches a tag.
#[derive(Args, Debug, Clone, Default)]
pub struct ReaderArgs {
    /// Tag memory image file to use instead of a hardware reader.
    /// A missing file reads as "no tag present".
    #[arg(long, value_name = "PATH", env = "TAPATTEND_SIM_IMAGE")]
    pub sim_image: Option<PathBuf>,
    /// Preferred PC/SC reader (substring of its name). Default: first reader.
    #[arg(long, value_name = "NAME", env = "TAPATTEND_READER")]
    pub reader: Option<String>,
}

pub type Session = TagSession<Box<dyn CardReader>>;

/// Open the selected reader. `--sim-image` wins over `--reader`.
pub fn open(args: &ReaderArgs, layout: BlockLayout) -> CliResult<Session> {
    if let Some(path) = &args.sim_image {
        let backend = ImageBackend::new(path);
        return open_session(&backend, None, layout)
            .map(TagSession::boxed)
            .map_err(|err| transport_error("reader open failed", err));
    }
    open_hardware(args, layout)
}

#[cfg(feature = "pcsc")]
fn open_hardware(args: &ReaderArgs, layout: BlockLayout) -> CliResult<Session> {
    let backend = tapattend_transport::PcscBackend::establish()
        .map_err(|err| transport_error("PC/SC unavailable", err))?;
    open_session(&backend, args.reader.as_deref(), layout)
        .map(TagSession::boxed)
        .map_err(|err| transport_error("reader open failed", err))
}

#[cfg(not(feature = "pcsc"))]
fn open_hardware(_args: &ReaderArgs, _layout: BlockLayout) -> CliResult<Session> {
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        "no reader backend: pass --sim-image or build with the `pcsc` feature",
    ))
}

/// Names of the readers the selected backend can see.
pub fn list_readers(args: &ReaderArgs) -> CliResult<Vec<String>> {
    use tapattend_transport::ReaderBackend;

    if let Some(path) = &args.sim_image {
        return ImageBackend::new(path)
            .list_readers()
            .map_err(|err| transport_error("reader list failed", err));
    }

    #[cfg(feature = "pcsc")]
    {
        tapattend_transport::PcscBackend::establish()
            .and_then(|backend| backend.list_readers())
            .map_err(|err| transport_error("reader list failed", err))
    }

    #[cfg(not(feature = "pcsc"))]
    {
        open_hardware(args, BlockLayout::default()).map(|_| Vec::new())
    }
}
