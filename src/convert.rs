use std::path::Path;

use log::info;

use crate::error::Result;
use crate::formats::{load_examples, FormatKind, LoadOptions, WriteOptions};

/// Options for reading the input file and writing the output file of a conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertOptions {
    pub load: LoadOptions,
    pub write: WriteOptions,
}

/// Rewrite a feature file in the format named by the output extension.
///
/// Ids, labels and feature values survive the conversion; both extensions are checked
/// before anything is read.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q, options: &ConvertOptions) -> Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let from = FormatKind::from_path(input)?;
    let to = FormatKind::from_path(output)?;

    let set = load_examples(input, &options.load)?;
    info!("Converting {} ({:?}) to {} ({:?})", input.display(), from, output.display(), to);
    to.write(output, &set, &options.write)
}
