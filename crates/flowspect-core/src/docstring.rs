//! Numpy-style docstring parsing.
//!
//! Recognises the `Parameters` and `Returns` sections, each underlined by at
//! least three dashes:
//!
//! ```text
//! Short description.
//!
//! Parameters
//! ----------
//! inputFile
//!     Help text for `inputFile`.
//!
//! Returns
//! -------
//! What comes back.
//! ```

use lazy_regex::regex;

/// Descriptions extracted from a docstring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocstring {
    /// First line of the docstring
    pub short_description: String,
    /// Everything before the first section header
    pub description: String,
    /// Parameter name to its (first line of) help text, in documented order
    pub params: Vec<(String, String)>,
    /// Text of the `Returns` section, one trimmed line per source line
    pub returns: String,
}

impl ParsedDocstring {
    /// Parse a raw docstring. `None` yields an empty result.
    pub fn parse(docstring: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let Some(docstring) = docstring.map(str::trim).filter(|d| !d.is_empty()) else {
            return parsed;
        };

        let (first, rest) = match docstring.split_once('\n') {
            Some((first, rest)) => (first, Some(rest)),
            None => (docstring, None),
        };
        parsed.short_description = first.to_string();

        if rest.is_none() {
            parsed.description = parsed.short_description.clone();
            return parsed;
        }

        let mut sections = "";
        match regex!(r"\s{2,}(?:Parameters|Returns)\s+-{3,}").find(docstring) {
            Some(header) => {
                sections = docstring[header.start()..].trim();
                parsed.description = docstring[..header.start()].trim_end().to_string();
            }
            None => parsed.description = docstring.to_string(),
        }

        if let Some(caps) = regex!(r"(?s)\s{2,}Returns\s+-{3,}\s+(?P<doc>.*)").captures(sections)
            && let (Some(whole), Some(doc)) = (caps.get(0), caps.name("doc"))
        {
            parsed.returns = reindent(doc.as_str());
            sections = &sections[..whole.start()];
        }

        if let Some(header) = regex!(r"\s*Parameters\s+-{3,}").find(sections) {
            sections = &sections[header.end()..];
        }

        for caps in regex!(r"\s+(?P<name>[\*\w]+)\n\s+(?P<doc>.*)").captures_iter(sections) {
            if let (Some(name), Some(doc)) = (caps.name("name"), caps.name("doc")) {
                let doc = doc.as_str().trim_end().to_string();
                match parsed.params.iter_mut().find(|(n, _)| n == name.as_str()) {
                    Some(entry) => entry.1 = doc,
                    None => parsed.params.push((name.as_str().to_string(), doc)),
                }
            }
        }

        parsed
    }

    /// Help text documented for `param`, if any.
    pub fn param_help(&self, param: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, doc)| doc.as_str())
    }
}

fn reindent(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
