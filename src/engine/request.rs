//! engine::request
//!
//! Operation requests: a name plus a JSON parameter map.
//!
//! Requests are usually built from a git-style command string with
//! [`OperationRequest::parse`]:
//!
//! | Command | Params |
//! |---------|--------|
//! | `rebase <onto> [<branch>]`, `rebase -o\|--onto <onto> [<branch>]` | `onto`, `source` |
//! | `merge <branch> [--no-ff]` | `source`, `no_ff` |
//! | `reset [--soft\|--mixed\|--hard] [<target>]` | `target`, `mode` |
//! | `cherry-pick [-m\|--mainline <n>] <commit>...` | `commits`, `mainline` |
//!
//! Unrecognised operations keep their raw arguments under `args` so a
//! simulator extension can interpret them.

use super::SimError;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named operation and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Canonical spelling of an operation name.
pub fn normalize_operation(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "cherry_pick" | "cherrypick" => "cherry-pick".to_string(),
        _ => lower,
    }
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parse a git-style command such as `"reset --hard HEAD~2"`.
    ///
    /// A leading `git` is ignored.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidParams`] for an empty command, a missing required
    /// argument, or an unknown flag on a built-in operation.
    ///
    /// # Example
    ///
    /// ```
    /// use git_sim::engine::request::OperationRequest;
    ///
    /// let req = OperationRequest::parse("git reset --hard HEAD~2").unwrap();
    /// assert_eq!(req.operation, "reset");
    /// assert_eq!(req.params["mode"], "hard");
    /// assert_eq!(req.params["target"], "HEAD~2");
    /// ```
    pub fn parse(input: &str) -> Result<Self, SimError> {
        let mut words = input.split_whitespace().peekable();
        if words.peek() == Some(&"git") {
            words.next();
        }
        let name = words.next().ok_or_else(|| invalid("", "empty command"))?;
        let operation = normalize_operation(name);
        let args: Vec<&str> = words.collect();

        let request = match operation.as_str() {
            "rebase" | "merge" | "reset" | "cherry-pick" => {
                let argv = std::iter::once(operation.as_str()).chain(args.iter().copied());
                let parsed = GitCommand::try_parse_from(argv)
                    .map_err(|err| invalid(&operation, clap_message(&err)))?;
                parsed.command.into_request()?
            }
            _ => Self::new(operation).with_param(
                "args",
                args.iter().map(|a| Value::from(*a)).collect::<Vec<_>>(),
            ),
        };
        Ok(request)
    }
}

#[derive(Parser, Debug)]
#[command(name = "git", no_binary_name = true, disable_help_subcommand = true)]
struct GitCommand {
    #[command(subcommand)]
    command: Builtin,
}

/// Argument shapes of the built-in operations.
#[derive(Subcommand, Debug)]
enum Builtin {
    /// `rebase [--onto <onto>] [<upstream>] [<branch>]`
    Rebase {
        #[arg(short = 'o', long)]
        onto: Option<String>,
        upstream: Option<String>,
        branch: Option<String>,
    },
    Merge {
        #[arg(long = "no-ff", overrides_with = "ff")]
        no_ff: bool,
        #[arg(long, overrides_with = "no_ff")]
        ff: bool,
        branch: String,
    },
    Reset {
        #[arg(long, overrides_with_all = ["mixed", "hard"])]
        soft: bool,
        #[arg(long, overrides_with_all = ["soft", "hard"])]
        mixed: bool,
        #[arg(long, overrides_with_all = ["soft", "mixed"])]
        hard: bool,
        target: Option<String>,
    },
    #[command(name = "cherry-pick")]
    CherryPick {
        #[arg(short = 'm', long = "mainline", value_name = "PARENT")]
        mainline: Option<u64>,
        #[arg(required = true)]
        commits: Vec<String>,
    },
}

impl Builtin {
    fn into_request(self) -> Result<OperationRequest, SimError> {
        let request = match self {
            Builtin::Rebase {
                onto,
                upstream,
                branch,
            } => {
                // With --onto the first positional names the branch to replay.
                let (onto, source) = match (onto, upstream, branch) {
                    (Some(_), Some(_), Some(_)) => {
                        return Err(invalid(
                            "rebase",
                            "an upstream separate from --onto is not supported",
                        ))
                    }
                    (Some(onto), source, None) => (onto, source),
                    (None, Some(onto), source) => (onto, source),
                    (_, None, _) => {
                        return Err(invalid("rebase", "missing upstream to rebase onto"))
                    }
                };
                let request = OperationRequest::new("rebase").with_param("onto", onto);
                match source {
                    Some(source) => request.with_param("source", source),
                    None => request,
                }
            }
            Builtin::Merge { no_ff, ff, branch } => OperationRequest::new("merge")
                .with_param("source", branch)
                .with_param("no_ff", no_ff && !ff),
            Builtin::Reset {
                soft,
                mixed,
                hard,
                target,
            } => {
                let mode = match (soft, mixed, hard) {
                    (_, _, true) => "hard",
                    (true, _, _) => "soft",
                    _ => "mixed",
                };
                OperationRequest::new("reset")
                    .with_param("target", target.unwrap_or_else(|| "HEAD".to_string()))
                    .with_param("mode", mode)
            }
            Builtin::CherryPick { mainline, commits } => {
                let request = OperationRequest::new("cherry-pick").with_param("commits", commits);
                match mainline {
                    Some(n) => request.with_param("mainline", n),
                    None => request,
                }
            }
        };
        Ok(request)
    }
}

fn invalid(operation: &str, message: impl Into<String>) -> SimError {
    SimError::InvalidParams {
        operation: operation.to_string(),
        message: message.into(),
    }
}

/// First line of a clap error, without the `error: ` prefix.
fn clap_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.trim_start_matches("error: ").to_string()
}
