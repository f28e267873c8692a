use std::str::FromStr;

use semver::Version;
use unscanny::Scanner;
use url::Url;

use pinion_types::Slug;

use crate::{EntrySource, Error, ModuleEntry, ParseOptions, Puppetfile, DEFAULT_FORGE_URL};

/// A `mod` declaration being accumulated across continuation lines.
struct Pending {
    line: usize,
    text: String,
    comment: Option<String>,
}

pub(crate) fn parse(text: &str, options: &ParseOptions) -> Result<Puppetfile, Error> {
    let mut forge = Url::parse(DEFAULT_FORGE_URL).unwrap();
    let mut modules = Vec::new();
    let mut dependencies = Vec::new();
    let mut in_dependencies = false;
    let mut comment: Vec<&str> = Vec::new();
    let mut pending: Option<Pending> = None;

    let mut flush = |pending: &mut Option<Pending>,
                     in_dependencies: bool,
                     modules: &mut Vec<ModuleEntry>,
                     dependencies: &mut Vec<ModuleEntry>|
     -> Result<(), Error> {
        if let Some(declaration) = pending.take() {
            let entry = parse_declaration(&declaration)?;
            if in_dependencies {
                dependencies.push(entry);
            } else {
                modules.push(entry);
            }
        }
        Ok(())
    };

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        if line.contains(&options.dependency_sentinel) {
            flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;
            comment.clear();
            in_dependencies = true;
        } else if line.is_empty() {
            flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;
            comment.clear();
        } else if let Some(rest) = keyword(line, "forge") {
            flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;
            forge = parse_forge(rest, number)?;
        } else if let Some(_rest) = keyword(line, "mod") {
            flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;
            pending = Some(Pending {
                line: number,
                text: line.to_string(),
                comment: if comment.is_empty() {
                    None
                } else {
                    Some(comment.join("\n"))
                },
            });
            comment.clear();
        } else if line.starts_with('#') {
            flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;
            comment.push(line);
        } else if let Some(declaration) = pending.as_mut() {
            // Continuation of the declaration above.
            declaration.text.push_str(line);
        } else {
            return Err(Error::UnexpectedContent {
                line: number,
                content: line.to_string(),
            });
        }
    }
    flush(&mut pending, in_dependencies, &mut modules, &mut dependencies)?;

    Ok(Puppetfile {
        forge,
        modules,
        dependencies,
        sentinel: options.dependency_sentinel.clone(),
    })
}

/// Match a leading keyword followed by whitespace; returns the remainder.
fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn parse_forge(rest: &str, line: usize) -> Result<Url, Error> {
    let mut s = Scanner::new(rest);
    let url = quoted(&mut s, line, "forge URL")?;
    Url::parse(&url).map_err(|source| Error::InvalidForge { line, source })
}

/// Parse one joined `mod` declaration.
fn parse_declaration(pending: &Pending) -> Result<ModuleEntry, Error> {
    let line = pending.line;
    let mut s = Scanner::new(&pending.text);
    s.eat_if("mod");
    s.eat_whitespace();

    let name = quoted(&mut s, line, "module name")?;
    let slug = Slug::from_str(&name).map_err(|source| Error::Slug { line, source })?;

    let mut version = None;
    let mut git = None;
    let mut reference = None;
    loop {
        s.eat_whitespace();
        if s.done() {
            break;
        }
        if !s.eat_if(',') {
            return Err(invalid(line, format!("expected `,` before `{}`", s.after())));
        }
        s.eat_whitespace();
        if s.eat_if(':') {
            let key = s.eat_while(char::is_alphanumeric).to_string();
            s.eat_whitespace();
            if !s.eat_if("=>") {
                return Err(invalid(line, format!("expected `=>` after `:{key}`")));
            }
            s.eat_whitespace();
            let value = quoted(&mut s, line, "parameter value")?;
            match key.as_str() {
                "git" => {
                    git = Some(Url::parse(&value).map_err(|err| {
                        invalid(line, format!("invalid git URL `{value}`: {err}"))
                    })?);
                }
                "ref" | "tag" | "branch" | "commit" => reference = Some(value),
                _ => return Err(invalid(line, format!("unsupported parameter `:{key}`"))),
            }
        } else if matches!(s.peek(), Some('\'' | '"')) {
            if version.is_some() {
                return Err(invalid(line, "duplicate version".to_string()));
            }
            let value = quoted(&mut s, line, "version")?;
            version =
                Some(Version::parse(&value).map_err(|source| Error::Version { line, source })?);
        } else {
            return Err(invalid(
                line,
                format!("expected `:key => value` or a quoted version, found `{}`", s.after()),
            ));
        }
    }

    let source = match git {
        Some(url) => {
            if version.is_some() {
                return Err(invalid(line, "a git module takes no version".to_string()));
            }
            EntrySource::Git { url, reference }
        }
        None => {
            if reference.is_some() {
                return Err(invalid(line, "`:ref` requires `:git`".to_string()));
            }
            EntrySource::Forge { version }
        }
    };

    Ok(ModuleEntry {
        slug,
        source,
        comment: pending.comment.clone(),
    })
}

/// Consume a single- or double-quoted string.
fn quoted(s: &mut Scanner<'_>, line: usize, what: &str) -> Result<String, Error> {
    let quote = match s.eat() {
        Some(c @ ('\'' | '"')) => c,
        _ => return Err(invalid(line, format!("expected a quoted {what}"))),
    };
    let content = s.eat_while(|c| c != quote).to_string();
    if !s.eat_if(quote) {
        return Err(invalid(line, format!("unterminated {what}")));
    }
    Ok(content)
}

fn invalid(line: usize, message: impl Into<String>) -> Error {
    Error::InvalidDeclaration {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::{EntrySource, Error, ParseOptions, Puppetfile, DEFAULT_FORGE_URL};

    #[test]
    fn empty_manifest_gets_the_default_forge() {
        let puppetfile = Puppetfile::parse("").unwrap();
        assert_eq!(
            puppetfile.forge.as_str().trim_end_matches('/'),
            DEFAULT_FORGE_URL
        );
        assert!(puppetfile.modules.is_empty());
        assert!(puppetfile.dependencies.is_empty());
    }

    #[test]
    fn sentinel_splits_the_lists() {
        let puppetfile = Puppetfile::parse(indoc! {r"
            forge 'https://stub.example.com'
            mod 'acme-base', '1.0.0'
            ## dependencies
            mod 'acme-dep', '2.0.0'
        "})
        .unwrap();
        assert_eq!(puppetfile.forge.as_str(), "https://stub.example.com/");
        assert_eq!(puppetfile.modules.len(), 1);
        assert_eq!(puppetfile.modules[0].slug.to_string(), "acme-base");
        assert_eq!(puppetfile.dependencies.len(), 1);
        assert_eq!(puppetfile.dependencies[0].slug.to_string(), "acme-dep");
    }

    #[test]
    fn version_on_a_continuation_line() {
        let puppetfile = Puppetfile::parse(indoc! {r"
            mod 'acme-base',
              '1.2.3'
        "})
        .unwrap();
        let EntrySource::Forge { version } = &puppetfile.modules[0].source else {
            panic!("expected a forge module");
        };
        assert_eq!(version.as_ref().unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn git_declaration_with_wrapped_parameters() {
        let puppetfile = Puppetfile::parse(indoc! {r"
            mod 'acme-base',
              :git => 'https://git.example.com/acme/base.git',
              :ref => 'v1.0.0'
        "})
        .unwrap();
        let EntrySource::Git { url, reference } = &puppetfile.modules[0].source else {
            panic!("expected a git module");
        };
        assert_eq!(url.as_str(), "https://git.example.com/acme/base.git");
        assert_eq!(reference.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn tag_and_branch_are_reference_spellings() {
        for key in ["tag", "branch", "commit"] {
            let text = format!("mod 'acme-base', :git => 'https://e.com/r.git', :{key} => 'x'\n");
            let puppetfile = Puppetfile::parse(&text).unwrap();
            let EntrySource::Git { reference, .. } = &puppetfile.modules[0].source else {
                panic!("expected a git module");
            };
            assert_eq!(reference.as_deref(), Some("x"));
        }
    }

    #[test]
    fn comments_attach_to_the_next_module() {
        let puppetfile = Puppetfile::parse(indoc! {r"
            # first line
            # second line
            mod 'acme-base', '1.0.0'
        "})
        .unwrap();
        assert_eq!(
            puppetfile.modules[0].comment.as_deref(),
            Some("# first line\n# second line")
        );
    }

    #[test]
    fn blank_lines_reset_the_pending_comment() {
        let puppetfile = Puppetfile::parse(indoc! {r"
            # orphaned

            mod 'acme-base', '1.0.0'
        "})
        .unwrap();
        assert_eq!(puppetfile.modules[0].comment, None);
    }

    #[test]
    fn custom_sentinel() {
        let options = ParseOptions {
            dependency_sentinel: "#### managed below ####".to_string(),
        };
        let puppetfile = Puppetfile::parse_with(
            indoc! {r"
                mod 'acme-base', '1.0.0'
                #### managed below ####
                mod 'acme-dep', '2.0.0'
            "},
            &options,
        )
        .unwrap();
        assert_eq!(puppetfile.modules.len(), 1);
        assert_eq!(puppetfile.dependencies.len(), 1);
    }

    #[test]
    fn slash_separator_in_name() {
        let puppetfile = Puppetfile::parse("mod 'puppetlabs/stdlib', '8.0.0'\n").unwrap();
        assert_eq!(puppetfile.modules[0].slug.to_string(), "puppetlabs-stdlib");
    }

    #[test]
    fn rejects_unexpected_content() {
        let err = Puppetfile::parse("not a declaration\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedContent { line: 1, .. }));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Puppetfile::parse("mod 'acme-base\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration { line: 1, .. }));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let err =
            Puppetfile::parse("mod 'acme-base', :install_path => 'x'\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration { .. }));
    }

    #[test]
    fn rejects_ref_without_git() {
        let err = Puppetfile::parse("mod 'acme-base', :ref => 'v1'\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration { .. }));
    }

    #[test]
    fn rejects_version_on_a_git_module() {
        let err =
            Puppetfile::parse("mod 'acme-base', '1.0.0', :git => 'https://e.com/r.git'\n")
                .unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration { .. }));
    }

    #[test]
    fn rejects_bad_version() {
        let err = Puppetfile::parse("mod 'acme-base', 'one'\n").unwrap_err();
        assert!(matches!(err, Error::Version { line: 1, .. }));
    }
}
