//! `clap` rendition of a [`CommandBinding`].
//!
//! Used to recover the concrete argument values a generated script was run
//! with, e.g. by the notebook capture renderer.

use clap::{Arg, ArgAction, ArgMatches, Command};

use super::binding::{ArgumentSpec, CommandBinding};
use super::overrides::ValueKind;
use crate::error::{Error, Result};
use crate::python::PyValue;

const PEEK_ID: &str = "displayMax";
const INSPECT_ID: &str = "inspect";
const REST_ID: &str = "__rest";

/// Values parsed from a script command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    /// Destination name to value, in argument order
    pub values: Vec<(String, PyValue)>,
    /// Peek request (`-p N[,C]`)
    pub peek: Option<Vec<String>>,
    /// Positional arguments beyond the bound ones, forwarded to `*args`
    pub rest: Vec<String>,
}

impl BoundArguments {
    pub fn get(&self, dest: &str) -> Option<&PyValue> {
        self.values.iter().find(|(d, _)| d == dest).map(|(_, v)| v)
    }
}

impl CommandBinding {
    /// Build the equivalent `clap` command.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.function.clone())
            .about(self.description.clone())
            .disable_version_flag(true)
            .arg(
                Arg::new(PEEK_ID)
                    .short('p')
                    .long("peek")
                    .value_delimiter(',')
                    .help("Peek into the results by printing or saving the first N lines only"),
            )
            .arg(
                Arg::new(INSPECT_ID)
                    .short('i')
                    .long("inspect")
                    .action(ArgAction::SetTrue)
                    .help("Shows what functions are defined"),
            );

        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone()).arg(
                Arg::new("version")
                    .long("version")
                    .action(ArgAction::Version)
                    .help("Displays script version if supplied"),
            );
        }

        for spec in &self.arguments {
            cmd = cmd.arg(clap_arg(spec));
        }

        cmd.arg(
            Arg::new(REST_ID)
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .hide(true),
        )
    }

    /// Parse a script command line (without the program name).
    pub fn parse<S: AsRef<str>>(&self, argv: &[S]) -> Result<BoundArguments> {
        let argv = std::iter::once(self.function.clone())
            .chain(argv.iter().map(|a| a.as_ref().to_string()));
        let matches = self
            .command()
            .try_get_matches_from(argv)
            .map_err(|e| Error::Arguments(e.to_string()))?;

        let values = self
            .arguments
            .iter()
            .map(|spec| (spec.dest.clone(), value_of(&matches, spec)))
            .collect();

        Ok(BoundArguments {
            values,
            peek: strings(&matches, PEEK_ID),
            rest: strings(&matches, REST_ID).unwrap_or_default(),
        })
    }
}

fn clap_arg(spec: &ArgumentSpec) -> Arg {
    let mut arg = Arg::new(spec.dest.clone()).help(spec.help.clone());

    let mut longs = Vec::new();
    for flag in &spec.flags {
        if let Some(long) = flag.strip_prefix("--") {
            longs.push(long.to_string());
        } else if let Some(short) = flag.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => arg = arg.short(c),
                _ => longs.push(short.to_string()),
            }
        }
    }
    let mut longs = longs.into_iter();
    if let Some(first) = longs.next() {
        arg = arg.long(first);
    }
    for alias in longs {
        arg = arg.alias(alias);
    }

    if spec.kind.is_list() {
        arg = arg
            .action(ArgAction::Append)
            .value_delimiter(',')
            .num_args(0..);
    } else {
        arg = arg.action(ArgAction::Set);
    }
    arg
}

fn strings(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
}

fn value_of(matches: &ArgMatches, spec: &ArgumentSpec) -> PyValue {
    let Some(raw) = strings(matches, &spec.dest) else {
        return spec.default.clone().unwrap_or(PyValue::None);
    };

    if spec.kind.is_list() {
        let kind = match spec.kind {
            ValueKind::List => ValueKind::StrList,
            other => other,
        };
        PyValue::List(raw.iter().map(|item| kind.convert(item)).collect())
    } else {
        raw.first()
            .map_or(PyValue::None, |value| spec.kind.convert(value))
    }
}
