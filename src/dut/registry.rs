//! Command registry
//!
//! The closed set of (domain, verb) pairs the harness knows how to send.
//! Test cases are checked against it when they are loaded, so a typo in a
//! verb fails before the DUT is ever contacted.

use std::collections::BTreeMap;

use super::protocol::Domain;

/// Whether an argument slot is required, optional or not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Required,
    Optional,
    Forbidden,
}

impl Arity {
    fn admits(&self, present: bool) -> bool {
        match self {
            Arity::Required => present,
            Arity::Optional => true,
            Arity::Forbidden => !present,
        }
    }
}

/// Argument shape of a registered command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Target address / name slot
    pub target: Arity,
    /// Input artifact slot
    pub input: Arity,
    /// At least one of target or input must be given
    pub target_or_input: bool,
    /// One-line description for `dm-testbench verbs`
    pub summary: &'static str,
}

impl CommandSpec {
    pub const fn new(target: Arity, input: Arity, summary: &'static str) -> Self {
        Self {
            target,
            input,
            target_or_input: false,
            summary,
        }
    }

    /// Both slots optional, but one of them must be present
    pub const fn either(summary: &'static str) -> Self {
        Self {
            target: Arity::Optional,
            input: Arity::Optional,
            target_or_input: true,
            summary,
        }
    }

    /// Check the operation's argument shape, returning a reason on mismatch
    pub fn check(&self, has_target: bool, has_input: bool) -> Result<(), String> {
        if !self.target.admits(has_target) {
            return Err(match self.target {
                Arity::Required => "requires a target".to_string(),
                _ => "does not take a target".to_string(),
            });
        }
        if !self.input.admits(has_input) {
            return Err(match self.input {
                Arity::Required => "requires an input artifact".to_string(),
                _ => "does not take an input artifact".to_string(),
            });
        }
        if self.target_or_input && !has_target && !has_input {
            return Err("requires a target or an input artifact".to_string());
        }
        Ok(())
    }
}

/// Registration point for DUT command mappings
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<(Domain, String), CommandSpec>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) a command mapping
    pub fn register(&mut self, domain: Domain, verb: &str, spec: CommandSpec) -> &mut Self {
        self.commands.insert((domain, verb.to_string()), spec);
        self
    }

    /// Look up a command mapping
    pub fn get(&self, domain: Domain, verb: &str) -> Option<&CommandSpec> {
        self.commands.get(&(domain, verb.to_string()))
    }

    /// All registered commands, ordered by domain then verb
    pub fn iter(&self) -> impl Iterator<Item = (Domain, &str, &CommandSpec)> {
        self.commands
            .iter()
            .map(|((domain, verb), spec)| (*domain, verb.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl CommandRegistry {
    /// The data master command set
    pub fn data_master() -> Self {
        use Arity::*;

        let mut registry = Self::empty();
        registry
            .register(
                Domain::Cmd,
                "reset",
                CommandSpec::new(Required, Forbidden, "reset DUT state (e.g. 'reset all')"),
            )
            .register(
                Domain::Cmd,
                "startpattern",
                CommandSpec::either("start a pattern by name, or add and start a pattern file"),
            )
            .register(
                Domain::Cmd,
                "stoppattern",
                CommandSpec::new(Required, Forbidden, "stop a running pattern"),
            )
            .register(
                Domain::Cmd,
                "abortpattern",
                CommandSpec::new(Required, Forbidden, "abort a running pattern"),
            )
            .register(
                Domain::Cmd,
                "rawstatus",
                CommandSpec::new(Required, Forbidden, "raw status snapshot of a thread"),
            )
            .register(
                Domain::Cmd,
                "status",
                CommandSpec::new(Forbidden, Forbidden, "DUT status summary"),
            )
            .register(
                Domain::Cmd,
                "-i",
                CommandSpec::new(Required, Required, "inject a command file at an address"),
            )
            .register(
                Domain::Sched,
                "add",
                CommandSpec::new(Required, Required, "add a schedule file under an id"),
            )
            .register(
                Domain::Sched,
                "remove",
                CommandSpec::new(Forbidden, Required, "remove the nodes of a schedule file"),
            )
            .register(
                Domain::Sched,
                "keep",
                CommandSpec::new(Forbidden, Required, "keep only the nodes of a schedule file"),
            )
            .register(
                Domain::Sched,
                "clear",
                CommandSpec::new(Forbidden, Forbidden, "remove all schedules"),
            )
            .register(
                Domain::Sched,
                "status",
                CommandSpec::new(Forbidden, Forbidden, "schedule status summary"),
            )
            .register(
                Domain::Sched,
                "rawvisited",
                CommandSpec::new(Required, Forbidden, "raw visited-node list of a thread"),
            );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_master_registry_covers_both_domains() {
        let registry = CommandRegistry::data_master();
        assert!(registry.get(Domain::Cmd, "reset").is_some());
        assert!(registry.get(Domain::Sched, "rawvisited").is_some());
        assert!(registry.get(Domain::Sched, "reset").is_none());
        assert!(registry.get(Domain::Cmd, "add").is_none());
    }

    #[test]
    fn test_register_replaces_existing_mapping() {
        let mut registry = CommandRegistry::data_master();
        let before = registry.len();
        registry.register(
            Domain::Cmd,
            "status",
            CommandSpec::new(Arity::Optional, Arity::Forbidden, "status of one thread"),
        );
        assert_eq!(registry.len(), before);
        assert_eq!(
            registry.get(Domain::Cmd, "status").unwrap().target,
            Arity::Optional
        );
    }

    #[test]
    fn test_check_arity() {
        let registry = CommandRegistry::data_master();

        let add = registry.get(Domain::Sched, "add").unwrap();
        assert!(add.check(true, true).is_ok());
        assert_eq!(add.check(true, false).unwrap_err(), "requires an input artifact");

        let reset = registry.get(Domain::Cmd, "reset").unwrap();
        assert_eq!(reset.check(false, false).unwrap_err(), "requires a target");
        assert_eq!(
            reset.check(true, true).unwrap_err(),
            "does not take an input artifact"
        );

        let start = registry.get(Domain::Cmd, "startpattern").unwrap();
        assert!(start.check(true, false).is_ok());
        assert!(start.check(false, true).is_ok());
        assert!(start.check(false, false).is_err());
    }

    #[test]
    fn test_iter_is_ordered() {
        let registry = CommandRegistry::data_master();
        let domains: Vec<Domain> = registry.iter().map(|(d, _, _)| d).collect();
        let mut sorted = domains.clone();
        sorted.sort();
        assert_eq!(domains, sorted);
    }
}
