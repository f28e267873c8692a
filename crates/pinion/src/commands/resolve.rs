use std::path::Path;

use anyhow::{Context, Result};
use fs_err as fs;
use rustc_hash::FxHashSet;
use tracing::debug;

use pinion_forge::ForgeClientBuilder;
use pinion_puppetfile::Puppetfile;
use pinion_resolver::{Resolver, ResolverOptions};
use pinion_types::Slug;

use crate::commands::ExitStatus;

/// Diagnostic dump written to the working directory on failure.
const ERROR_DUMP: &str = "errorDump.js";

/// Resolve a Puppetfile into one with every transitive module pinned.
pub(crate) async fn resolve(
    puppetfile: &Path,
    hide_file: Option<&Path>,
    ignore_file: Option<&Path>,
    preamble_file: Option<&Path>,
    output: Option<&Path>,
) -> Result<ExitStatus> {
    let text = fs::read_to_string(puppetfile)?;
    let manifest = Puppetfile::parse(&text)?;

    let options = ResolverOptions {
        hide: read_slugs(hide_file)?,
        ignore: read_slugs(ignore_file)?,
    };
    let preamble = preamble_file.map(fs::read_to_string).transpose()?;

    let client = ForgeClientBuilder::default().build();
    let mut resolver = Resolver::new(manifest, client, options);
    let resolved = match resolver.resolve().await {
        Ok(resolved) => resolved,
        Err(err) => {
            fs::write(ERROR_DUMP, resolver.diagnostics().to_json()?)?;
            debug!("wrote diagnostic dump to {ERROR_DUMP}");
            return Err(err.into());
        }
    };

    let rendered = resolved.render(preamble.as_deref());
    match output {
        Some(path) => fs::write(path, rendered)?,
        None => {
            #[allow(clippy::print_stdout)]
            {
                print!("{rendered}");
            }
        }
    }
    Ok(ExitStatus::Success)
}

/// Read a slug-per-line file; `#` comments and blank lines are skipped.
fn read_slugs(path: Option<&Path>) -> Result<FxHashSet<Slug>> {
    let Some(path) = path else {
        return Ok(FxHashSet::default());
    };
    let text = fs::read_to_string(path)?;
    let mut slugs = FxHashSet::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let slug = line
            .parse()
            .with_context(|| format!("invalid slug `{line}` in {}", path.display()))?;
        slugs.insert(slug);
    }
    Ok(slugs)
}
