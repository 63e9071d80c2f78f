//! Mock data master tool for integration testing
//!
//! Stands in for both `dm-cmd` and `dm-sched` so the harness can be
//! exercised without hardware:
//!
//! ```text
//! mock_dm <cmd|sched> <state-file> <verb> [args...]
//! ```
//!
//! DUT state lives in a JSON file so consecutive invocations see each
//! other's effects. Pattern files hold one statement per line:
//!
//! ```text
//! node <id> type=<type> pattern=<name>
//! edge <from> -> <to> type=<type>
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

/// Exit status for a rejected command
const EXIT_REJECTED: u8 = 1;
/// Exit status when the DUT cannot be reached
const EXIT_UNREACHABLE: u8 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    id: String,
    node_type: String,
    pattern: Option<String>,
    edges: Vec<(String, String)>, // (to, edge type)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MockState {
    /// Schedule id -> nodes in file order
    schedules: BTreeMap<String, Vec<Node>>,
    /// CPU -> visited node ids
    visited: BTreeMap<String, Vec<String>>,
    /// CPU -> running pattern
    running: BTreeMap<String, String>,
    /// Address -> injected command lines
    injected: BTreeMap<String, Vec<String>>,
}

enum Failure {
    Rejected(String),
    Unreachable(String),
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: mock_dm <cmd|sched> <state-file> <verb> [args...]");
        return ExitCode::from(EXIT_REJECTED);
    }

    match run(&args[0], Path::new(&args[1]), &args[2], &args[3..]) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(Failure::Rejected(message)) => {
            eprintln!("{}", message);
            ExitCode::from(EXIT_REJECTED)
        }
        Err(Failure::Unreachable(message)) => {
            eprintln!("{}", message);
            ExitCode::from(EXIT_UNREACHABLE)
        }
    }
}

fn run(domain: &str, state_file: &Path, verb: &str, args: &[String]) -> Result<String, Failure> {
    let reachable = state_file
        .parent()
        .map(|dir| dir.as_os_str().is_empty() || dir.is_dir())
        .unwrap_or(false);
    if !reachable {
        return Err(Failure::Unreachable(format!(
            "eb-device: could not connect to {}",
            state_file.display()
        )));
    }

    let mut state = load_state(state_file)?;
    let output = match domain {
        "cmd" => state.cmd(verb, args)?,
        "sched" => state.sched(verb, args)?,
        other => return Err(Failure::Rejected(format!("unknown tool domain '{}'", other))),
    };
    save_state(state_file, &state)?;
    Ok(output)
}

fn load_state(path: &Path) -> Result<MockState, Failure> {
    if !path.exists() {
        return Ok(MockState::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Failure::Unreachable(format!("eb-device: read failed: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| Failure::Unreachable(format!("eb-device: corrupt state: {}", e)))
}

fn save_state(path: &Path, state: &MockState) -> Result<(), Failure> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| Failure::Unreachable(format!("eb-device: write failed: {}", e)))?;
    std::fs::write(path, json)
        .map_err(|e| Failure::Unreachable(format!("eb-device: write failed: {}", e)))
}

fn arg<'a>(args: &'a [String], index: usize, verb: &str) -> Result<&'a str, Failure> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Failure::Rejected(format!("{}: missing argument {}", verb, index + 1)))
}

/// CPU part of a "cpu.thread" address
fn cpu_of(address: &str) -> String {
    address.split('.').next().unwrap_or(address).to_string()
}

impl MockState {
    fn cmd(&mut self, verb: &str, args: &[String]) -> Result<String, Failure> {
        match verb {
            "reset" => {
                if arg(args, 0, verb)? != "all" {
                    return Err(Failure::Rejected("reset: only 'reset all' is supported".into()));
                }
                *self = MockState::default();
                Ok(String::new())
            }
            "startpattern" => {
                let what = arg(args, 0, verb)?;
                let names = if Path::new(what).is_file() {
                    let nodes = parse_pattern_file(Path::new(what))?;
                    validate(&nodes)?;
                    let mut names: Vec<String> = Vec::new();
                    for pattern in nodes.iter().filter_map(|n| n.pattern.as_ref()) {
                        if !names.contains(pattern) {
                            names.push(pattern.clone());
                        }
                    }
                    self.schedules.entry("0".to_string()).or_default().extend(nodes);
                    names
                } else {
                    vec![what.to_string()]
                };
                for name in &names {
                    self.start(name)?;
                }
                Ok(String::new())
            }
            "stoppattern" | "abortpattern" => {
                let name = arg(args, 0, verb)?;
                let before = self.running.len();
                self.running.retain(|_, running| running.as_str() != name);
                if before == self.running.len() {
                    return Err(Failure::Rejected(format!("Pattern {} is not running", name)));
                }
                Ok(String::new())
            }
            "rawstatus" => {
                let address = arg(args, 0, verb)?;
                let cpu = cpu_of(address);
                let pattern = self.running.get(&cpu).map(String::as_str).unwrap_or("idle");
                let visits = self.visited.get(&cpu).map(Vec::len).unwrap_or(0);
                Ok(format!(
                    "thread {}\npattern: {}\nvisits: {}\n",
                    address, pattern, visits
                ))
            }
            "status" => Ok(format!("patterns running: {}\n", self.running.len())),
            "-i" => {
                let address = arg(args, 0, verb)?;
                let file = arg(args, 1, verb)?;
                let content = std::fs::read_to_string(file)
                    .map_err(|e| Failure::Rejected(format!("cannot read {}: {}", file, e)))?;
                let lines: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string)
                    .collect();
                let count = lines.len();
                self.injected
                    .entry(address.to_string())
                    .or_default()
                    .extend(lines);
                Ok(format!("injected {} command(s) at {}\n", count, address))
            }
            other => Err(Failure::Rejected(format!("dm-cmd: unknown command '{}'", other))),
        }
    }

    fn sched(&mut self, verb: &str, args: &[String]) -> Result<String, Failure> {
        match verb {
            "add" => {
                let id = arg(args, 0, verb)?;
                let nodes = parse_pattern_file(Path::new(arg(args, 1, verb)?))?;
                validate(&nodes)?;
                self.schedules.entry(id.to_string()).or_default().extend(nodes);
                Ok(String::new())
            }
            "remove" | "keep" => {
                let nodes = parse_pattern_file(Path::new(arg(args, 0, verb)?))?;
                let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
                let keep = verb == "keep";
                for schedule in self.schedules.values_mut() {
                    schedule.retain(|n| ids.contains(&n.id.as_str()) == keep);
                }
                Ok(String::new())
            }
            "clear" => {
                self.schedules.clear();
                Ok(String::new())
            }
            "status" => {
                let nodes: usize = self.schedules.values().map(Vec::len).sum();
                Ok(format!("schedules: {}\nnodes: {}\n", self.schedules.len(), nodes))
            }
            "rawvisited" => {
                let address = arg(args, 0, verb)?;
                let visited = self.visited.get(&cpu_of(address)).cloned().unwrap_or_default();
                if visited.is_empty() {
                    Ok("none\n".to_string())
                } else {
                    Ok(visited.iter().map(|id| format!("{}\n", id)).collect())
                }
            }
            other => Err(Failure::Rejected(format!("dm-sched: unknown command '{}'", other))),
        }
    }

    /// Run a pattern once: every node of the pattern is visited in order
    fn start(&mut self, name: &str) -> Result<(), Failure> {
        let mut found = false;
        for (cpu, nodes) in &self.schedules {
            let members: Vec<String> = nodes
                .iter()
                .filter(|n| n.pattern.as_deref() == Some(name))
                .map(|n| n.id.clone())
                .collect();
            if members.is_empty() {
                continue;
            }
            found = true;
            self.visited.entry(cpu.clone()).or_default().extend(members);
            self.running.insert(cpu.clone(), name.to_string());
        }

        if found {
            Ok(())
        } else {
            Err(Failure::Rejected(format!("Pattern {} not found", name)))
        }
    }
}

fn parse_pattern_file(path: &Path) -> Result<Vec<Node>, Failure> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Failure::Rejected(format!("cannot read {}: {}", path.display(), e)))?;

    let mut nodes: Vec<Node> = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_error = || Failure::Rejected(format!("Parser error: line {}: '{}'", number + 1, line));
        let words: Vec<&str> = line.split_whitespace().collect();
        let attr = |key: &str| {
            words
                .iter()
                .find_map(|w| w.strip_prefix(key).and_then(|v| v.strip_prefix('=')))
                .map(str::to_string)
        };

        match words.first().copied() {
            Some("node") => {
                let id = words.get(1).ok_or_else(parse_error)?.to_string();
                nodes.push(Node {
                    id,
                    node_type: attr("type").ok_or_else(parse_error)?,
                    pattern: attr("pattern"),
                    edges: Vec::new(),
                });
            }
            Some("edge") => {
                let (from, to) = match (words.get(1), words.get(2), words.get(3)) {
                    (Some(from), Some(&"->"), Some(to)) => (*from, *to),
                    _ => return Err(parse_error()),
                };
                let edge_type = attr("type").ok_or_else(parse_error)?;
                let node = nodes.iter_mut().find(|n| n.id == from).ok_or_else(|| {
                    Failure::Rejected(format!("Node {} referenced by edge is not defined", from))
                })?;
                node.edges.push((to.to_string(), edge_type));
            }
            _ => return Err(parse_error()),
        }
    }

    for node in &nodes {
        for (to, _) in &node.edges {
            if !nodes.iter().any(|n| &n.id == to) {
                return Err(Failure::Rejected(format!(
                    "Node {} referenced by edge is not defined",
                    to
                )));
            }
        }
    }

    Ok(nodes)
}

/// Neighbourhood rules: a timing message needs a default destination and
/// must not have an alternative one
fn validate(nodes: &[Node]) -> Result<(), Failure> {
    for node in nodes.iter().filter(|n| n.node_type == "tmsg") {
        if node.edges.iter().any(|(_, t)| t == "altdst") {
            return Err(Failure::Rejected(format!(
                "Validation of Neighbourhood: Node {} of type {} must not have edge of type altdst",
                node.id, node.node_type
            )));
        }
        if !node.edges.iter().any(|(_, t)| t == "defdst") {
            return Err(Failure::Rejected(format!(
                "Validation of Neighbourhood: Node {} of type {} cannot be childless",
                node.id, node.node_type
            )));
        }
    }
    Ok(())
}
