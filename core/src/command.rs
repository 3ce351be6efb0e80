//! Typed SqlLocalDB requests and their command-line form.
//!
//! Each [`Request`] variant carries exactly the fields its operation takes,
//! so a formatted request can never reference an argument that was not
//! supplied. [`Request::args`] yields discrete argv entries; names are never
//! spliced into a shell string, so quotes or spaces inside an instance name
//! reach the tool unchanged.
//!
//! Callers holding loosely-typed input (a name/value map, a CLI layer of
//! their own) go through [`Request::from_named`], which performs the
//! required-argument checks.
//!
//! # Examples
//!
//! ```
//! use localdb_core::{NamedArgs, Operation, Request};
//!
//! let mut args = NamedArgs::new();
//! args.insert("name".into(), "Foo".into());
//! args.insert("version".into(), "13.0".into());
//! args.insert("start".into(), "true".into());
//!
//! let request = Request::from_named("create".parse::<Operation>().unwrap(), &args).unwrap();
//! assert_eq!(request.args(), ["create", "Foo", "13.0", "-s"]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{CommandError, Result};

/// Loosely-typed request arguments keyed by argument name.
pub type NamedArgs = BTreeMap<String, String>;

/// Operations understood by SqlLocalDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Delete,
    Start,
    Stop,
    Share,
    Unshare,
    Info,
    Versions,
    Trace,
}

impl Operation {
    pub const ALL: [Self; 9] = [
        Self::Create,
        Self::Delete,
        Self::Start,
        Self::Stop,
        Self::Share,
        Self::Unshare,
        Self::Info,
        Self::Versions,
        Self::Trace,
    ];

    /// Verb passed to the executable.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Share => "share",
            Self::Unshare => "unshare",
            Self::Info => "info",
            Self::Versions => "versions",
            Self::Trace => "trace",
        }
    }

    /// One-letter abbreviation the tool also accepts.
    pub fn alias(self) -> &'static str {
        match self {
            Self::Create => "c",
            Self::Delete => "d",
            Self::Start => "s",
            Self::Stop => "p",
            Self::Share => "h",
            Self::Unshare => "u",
            Self::Info => "i",
            Self::Versions => "v",
            Self::Trace => "t",
        }
    }

    /// Argument names this operation accepts.
    fn accepted_args(self) -> &'static [&'static str] {
        match self {
            Self::Create => &["name", "version", "start"],
            Self::Delete | Self::Start => &["name"],
            Self::Stop => &["name", "nowait", "kill"],
            Self::Share => &["name", "sharedname", "owner"],
            Self::Unshare => &["sharedname"],
            Self::Info => &["name"],
            Self::Versions => &[],
            Self::Trace => &["enable"],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CommandError;

    fn from_str(tag: &str) -> Result<Self> {
        let lower = tag.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == lower || op.alias() == lower)
            .ok_or_else(|| CommandError::UnsupportedOperation(tag.to_string()))
    }
}

/// A single SqlLocalDB invocation with its operation-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `create <name> [<version>] [-s]`. Without a version the tool picks
    /// the newest installed one.
    Create {
        name: String,
        version: Option<String>,
        start: bool,
    },
    Delete {
        name: String,
    },
    Start {
        name: String,
    },
    /// `stop <name> [-i] [-k]`: `-i` asks for a NOWAIT shutdown, `-k`
    /// kills the process without contacting it.
    Stop {
        name: String,
        nowait: bool,
        kill: bool,
    },
    Share {
        name: String,
        shared_name: String,
        owner: Option<String>,
    },
    Unshare {
        shared_name: String,
    },
    /// `info` lists instance names; `info <name>` describes one instance.
    Info {
        name: Option<String>,
    },
    Versions,
    Trace {
        enable: bool,
    },
}

impl Request {
    /// Builds a request from named arguments.
    ///
    /// Required arguments must be present and non-blank; boolean arguments
    /// accept `true/false`, `yes/no`, `on/off` and `1/0`. Arguments the
    /// operation does not take are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] for a missing, blank,
    /// unparseable or unexpected argument.
    pub fn from_named(operation: Operation, args: &NamedArgs) -> Result<Self> {
        let op = operation.as_str();
        if let Some(unexpected) = args
            .keys()
            .find(|key| !operation.accepted_args().contains(&key.as_str()))
        {
            return Err(CommandError::invalid(
                op,
                format!("unexpected argument '{unexpected}'"),
            ));
        }

        let request = match operation {
            Operation::Create => Self::Create {
                name: required(op, args, "name")?,
                version: optional(args, "version"),
                start: flag(op, args, "start")?.unwrap_or(false),
            },
            Operation::Delete => Self::Delete {
                name: required(op, args, "name")?,
            },
            Operation::Start => Self::Start {
                name: required(op, args, "name")?,
            },
            Operation::Stop => Self::Stop {
                name: required(op, args, "name")?,
                nowait: flag(op, args, "nowait")?.unwrap_or(false),
                kill: flag(op, args, "kill")?.unwrap_or(false),
            },
            Operation::Share => Self::Share {
                name: required(op, args, "name")?,
                shared_name: required(op, args, "sharedname")?,
                owner: optional(args, "owner"),
            },
            Operation::Unshare => Self::Unshare {
                shared_name: required(op, args, "sharedname")?,
            },
            Operation::Info => Self::Info {
                name: optional(args, "name"),
            },
            Operation::Versions => Self::Versions,
            Operation::Trace => Self::Trace {
                enable: flag(op, args, "enable")?
                    .ok_or_else(|| CommandError::invalid(op, "missing required argument 'enable'"))?,
            },
        };
        Ok(request)
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::Delete { .. } => Operation::Delete,
            Self::Start { .. } => Operation::Start,
            Self::Stop { .. } => Operation::Stop,
            Self::Share { .. } => Operation::Share,
            Self::Unshare { .. } => Operation::Unshare,
            Self::Info { .. } => Operation::Info,
            Self::Versions => Operation::Versions,
            Self::Trace { .. } => Operation::Trace,
        }
    }

    /// Instance name the request targets, if any.
    pub fn instance_name(&self) -> Option<&str> {
        match self {
            Self::Create { name, .. }
            | Self::Delete { name }
            | Self::Start { name }
            | Self::Stop { name, .. }
            | Self::Share { name, .. } => Some(name),
            Self::Info { name } => name.as_deref(),
            Self::Unshare { .. } | Self::Versions | Self::Trace { .. } => None,
        }
    }

    /// Argument vector to pass to the executable, verb first.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.operation().as_str().to_string()];
        match self {
            Self::Create {
                name,
                version,
                start,
            } => {
                args.push(name.clone());
                if let Some(version) = version {
                    args.push(version.clone());
                }
                if *start {
                    args.push("-s".to_string());
                }
            }
            Self::Delete { name } | Self::Start { name } => args.push(name.clone()),
            Self::Stop { name, nowait, kill } => {
                args.push(name.clone());
                if *nowait {
                    args.push("-i".to_string());
                }
                if *kill {
                    args.push("-k".to_string());
                }
            }
            Self::Share {
                name,
                shared_name,
                owner,
            } => {
                if let Some(owner) = owner {
                    args.push(owner.clone());
                }
                args.push(name.clone());
                args.push(shared_name.clone());
            }
            Self::Unshare { shared_name } => args.push(shared_name.clone()),
            Self::Info { name } => {
                if let Some(name) = name {
                    args.push(name.clone());
                }
            }
            Self::Versions => {}
            Self::Trace { enable } => {
                args.push(if *enable { "on" } else { "off" }.to_string());
            }
        }
        args
    }
}

fn optional(args: &NamedArgs, key: &str) -> Option<String> {
    args.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn required(op: &'static str, args: &NamedArgs, key: &str) -> Result<String> {
    match args.get(key) {
        None => Err(CommandError::invalid(
            op,
            format!("missing required argument '{key}'"),
        )),
        Some(value) if value.trim().is_empty() => Err(CommandError::invalid(
            op,
            format!("argument '{key}' cannot be empty"),
        )),
        Some(value) => Ok(value.clone()),
    }
}

fn flag(op: &'static str, args: &NamedArgs, key: &str) -> Result<Option<bool>> {
    let Some(raw) = args.get(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        _ => Err(CommandError::invalid(
            op,
            format!("argument '{key}' is not a boolean: {raw}"),
        )),
    }
}

/// A request bound to a concrete executable.
///
/// `Display` renders a quoted command line for logs and error messages; the
/// process itself is always started from [`program`](Self::program) and
/// [`args`](Self::args).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, request: &Request) -> Self {
        Self {
            program: program.into(),
            args: request.args(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|ch| ch.is_whitespace() || ch == '"') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, &str)]) -> NamedArgs {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_operation_parses_names_and_aliases() {
        assert_eq!("create".parse::<Operation>().unwrap(), Operation::Create);
        assert_eq!("STOP".parse::<Operation>().unwrap(), Operation::Stop);
        assert_eq!("p".parse::<Operation>().unwrap(), Operation::Stop);
        assert_eq!("h".parse::<Operation>().unwrap(), Operation::Share);
        assert_eq!("v".parse::<Operation>().unwrap(), Operation::Versions);
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
            assert_eq!(op.alias().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_operation_rejects_unknown_tag() {
        assert_eq!(
            "restart".parse::<Operation>(),
            Err(CommandError::UnsupportedOperation("restart".to_string()))
        );
    }

    #[test]
    fn test_missing_required_arguments_are_rejected() {
        let cases = [
            (Operation::Create, named(&[])),
            (Operation::Delete, named(&[])),
            (Operation::Start, named(&[])),
            (Operation::Stop, named(&[("kill", "true")])),
            (Operation::Share, named(&[("name", "Foo")])),
            (Operation::Share, named(&[("sharedname", "Bar")])),
            (Operation::Unshare, named(&[])),
            (Operation::Trace, named(&[])),
        ];
        for (op, args) in cases {
            let err = Request::from_named(op, &args).unwrap_err();
            assert!(
                matches!(err, CommandError::InvalidArgument { .. }),
                "{op}: unexpected {err:?}"
            );
        }
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let err = Request::from_named(Operation::Start, &named(&[("name", "  ")])).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument { operation: "start", .. }));
    }

    #[test]
    fn test_unexpected_argument_is_rejected() {
        let err =
            Request::from_named(Operation::Versions, &named(&[("name", "Foo")])).unwrap_err();
        assert!(err.to_string().contains("unexpected argument 'name'"));
    }

    #[test]
    fn test_unparseable_flag_is_rejected() {
        let err = Request::from_named(Operation::Trace, &named(&[("enable", "maybe")])).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument { operation: "trace", .. }));
    }

    #[test]
    fn test_create_args_follow_optional_fields() {
        let bare = Request::from_named(Operation::Create, &named(&[("name", "Foo")])).unwrap();
        assert_eq!(bare.args(), ["create", "Foo"]);

        let full = Request::from_named(
            Operation::Create,
            &named(&[("name", "Foo"), ("version", "13.0"), ("start", "yes")]),
        )
        .unwrap();
        assert_eq!(full.args(), ["create", "Foo", "13.0", "-s"]);

        let empty_version = Request::from_named(
            Operation::Create,
            &named(&[("name", "Foo"), ("version", ""), ("start", "false")]),
        )
        .unwrap();
        assert_eq!(empty_version.args(), ["create", "Foo"]);
    }

    #[test]
    fn test_stop_args_emit_flags_only_when_set() {
        let plain = Request::Stop {
            name: "Foo".into(),
            nowait: false,
            kill: false,
        };
        assert_eq!(plain.args(), ["stop", "Foo"]);

        let forced = Request::from_named(
            Operation::Stop,
            &named(&[("name", "Foo"), ("nowait", "on"), ("kill", "1")]),
        )
        .unwrap();
        assert_eq!(forced.args(), ["stop", "Foo", "-i", "-k"]);
    }

    #[test]
    fn test_share_args_put_owner_first() {
        let without_owner = Request::from_named(
            Operation::Share,
            &named(&[("name", "Foo"), ("sharedname", "FooShare")]),
        )
        .unwrap();
        assert_eq!(without_owner.args(), ["share", "Foo", "FooShare"]);

        let with_owner = Request::Share {
            name: "Foo".into(),
            shared_name: "FooShare".into(),
            owner: Some("DOMAIN\\user".into()),
        };
        assert_eq!(with_owner.args(), ["share", "DOMAIN\\user", "Foo", "FooShare"]);
    }

    #[test]
    fn test_info_versions_trace_args() {
        let list = Request::from_named(Operation::Info, &named(&[("name", "")])).unwrap();
        assert_eq!(list, Request::Info { name: None });
        assert_eq!(list.args(), ["info"]);
        assert_eq!(
            Request::Info {
                name: Some("Foo".into())
            }
            .args(),
            ["info", "Foo"]
        );
        assert_eq!(Request::Versions.args(), ["versions"]);
        assert_eq!(Request::Trace { enable: true }.args(), ["trace", "on"]);
        assert_eq!(Request::Trace { enable: false }.args(), ["trace", "off"]);
        assert_eq!(
            Request::Unshare {
                shared_name: "FooShare".into()
            }
            .args(),
            ["unshare", "FooShare"]
        );
    }

    #[test]
    fn test_names_with_quotes_stay_single_arguments() {
        let request = Request::Start {
            name: "evil\" & del *".into(),
        };
        assert_eq!(request.args(), ["start", "evil\" & del *"]);
        assert_eq!(request.instance_name(), Some("evil\" & del *"));
    }

    #[test]
    fn test_invocation_display_quotes_when_needed() {
        let invocation = Invocation::new(
            "C:\\Program Files\\SqlLocalDB.exe",
            &Request::Create {
                name: "My Instance".into(),
                version: None,
                start: true,
            },
        );
        assert_eq!(
            invocation.to_string(),
            "\"C:\\Program Files\\SqlLocalDB.exe\" create \"My Instance\" -s"
        );
    }
}
