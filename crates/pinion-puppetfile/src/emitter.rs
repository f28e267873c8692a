use std::fmt::Write;

use crate::{EntrySource, ModuleEntry, Puppetfile};

pub(crate) fn render(puppetfile: &Puppetfile, preamble: Option<&str>) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "forge '{}'",
        puppetfile.forge.as_str().trim_end_matches('/')
    );

    if let Some(preamble) = preamble {
        output.push('\n');
        output.push_str(preamble.trim_end());
        output.push('\n');
    }

    let mut repo: Vec<&ModuleEntry> = Vec::new();
    let mut forge: Vec<&ModuleEntry> = Vec::new();
    for entry in &puppetfile.modules {
        match entry.source {
            EntrySource::Git { .. } => repo.push(entry),
            EntrySource::Forge { .. } => forge.push(entry),
        }
    }
    repo.sort_by(|a, b| a.slug.cmp(&b.slug));
    forge.sort_by(|a, b| a.slug.cmp(&b.slug));

    if !repo.is_empty() || !forge.is_empty() {
        output.push('\n');
        for entry in repo.into_iter().chain(forge) {
            write_entry(&mut output, entry);
        }
    }

    output.push('\n');
    output.push_str(&puppetfile.sentinel);
    output.push('\n');

    let mut dependencies: Vec<&ModuleEntry> = puppetfile.dependencies.iter().collect();
    dependencies.sort_by(|a, b| a.slug.cmp(&b.slug));
    for entry in dependencies {
        write_entry(&mut output, entry);
    }

    output
}

fn write_entry(output: &mut String, entry: &ModuleEntry) {
    if let Some(comment) = &entry.comment {
        for line in comment.lines() {
            let _ = writeln!(output, "{line}");
        }
    }
    match &entry.source {
        EntrySource::Forge { version: Some(version) } => {
            let _ = writeln!(output, "mod '{}', '{}'", entry.slug, version);
        }
        EntrySource::Forge { version: None } => {
            let _ = writeln!(output, "mod '{}'", entry.slug);
        }
        EntrySource::Git { url, reference } => {
            let _ = writeln!(output, "mod '{}',", entry.slug);
            match reference {
                Some(reference) => {
                    let _ = writeln!(output, "  :git => '{url}',");
                    let _ = writeln!(output, "  :ref => '{reference}'");
                }
                None => {
                    let _ = writeln!(output, "  :git => '{url}'");
                }
            }
        }
    }
}
