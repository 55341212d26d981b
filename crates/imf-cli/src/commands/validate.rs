//! `imf validate`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use imf_core::document::read_document;
use imf_core::validate::{validate, validate_all};

use crate::output;

#[derive(Args)]
pub struct ValidateArgs {
    /// Documents to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Report every violation instead of stopping at the first
    #[arg(long)]
    pub all: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let mut rejected = 0;

    for path in &args.files {
        let document = match read_document(path) {
            Ok(document) => document,
            Err(e) => {
                output::print_rejected(path, &[]);
                println!("    {}", e);
                rejected += 1;
                continue;
            }
        };

        let result = if args.all {
            validate_all(&document)
        } else {
            validate(&document).map_err(|violation| vec![violation])
        };

        match result {
            Ok(validated) => output::print_valid(path, &validated),
            Err(violations) => {
                output::print_rejected(path, &violations);
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        anyhow::bail!("{} of {} document(s) rejected", rejected, args.files.len());
    }
    Ok(())
}

