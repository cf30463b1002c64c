//! Compatibility translator
//!
//! Looks up the alias table of a legacy command, assembles the target
//! dispatches from the supplied parameters and hands them to an executor.
//!
//! # Example
//! ```
//! use rrfshim_core::{InvocationContext, Translator};
//!
//! let supplied = InvocationContext::from_pairs([("S", "128"), ("T", "2")]);
//! let translation = Translator::builtin().translate("M106", &supplied).unwrap();
//! assert_eq!(
//!     translation.primary().to_string(),
//!     "KTC_SET_AND_SAVE_PARTFAN_SPEED P=2 S=128"
//! );
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

use crate::alias::{CommandAlias, ParameterRule};
use crate::builtin::builtin_aliases;
use crate::command::{CommandLine, InvocationContext};
use crate::dispatch::{CommandExecutor, Dispatch};
use crate::error::{Result, TranslateError};

/// Result of translating one legacy command
///
/// Only built by [`Translator::translate`], so it always holds the primary
/// dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    source: String,
    chained: Vec<Dispatch>,
    primary: Dispatch,
}

impl Translation {
    /// Legacy command name as looked up
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The dispatch of the alias' own target command
    pub fn primary(&self) -> &Dispatch {
        &self.primary
    }

    /// Dispatches emitted before the primary one
    pub fn chained(&self) -> &[Dispatch] {
        &self.chained
    }

    /// Every dispatch in execution order, the primary one last
    pub fn dispatches(&self) -> impl Iterator<Item = &Dispatch> {
        self.chained.iter().chain(std::iter::once(&self.primary))
    }

    /// Number of dispatches, the primary one included
    pub fn dispatch_count(&self) -> usize {
        self.chained.len() + 1
    }

    /// Rendered text of every dispatch, in order
    pub fn lines(&self) -> Vec<String> {
        self.dispatches().map(ToString::to_string).collect()
    }
}

/// Immutable set of alias tables
#[derive(Debug, Clone, Default)]
pub struct Translator {
    aliases: Vec<CommandAlias>,
    index: HashMap<String, usize>,
}

impl Translator {
    /// Build a translator from alias tables
    ///
    /// A later alias with the same name replaces an earlier one in place.
    pub fn new<I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = CommandAlias>,
    {
        let mut translator = Self::default();
        for alias in aliases {
            let key = alias.name.to_ascii_uppercase();
            match translator.index.get(&key) {
                Some(&pos) => {
                    debug!(command = %key, "replacing alias table");
                    translator.aliases[pos] = alias;
                }
                None => {
                    translator.index.insert(key, translator.aliases.len());
                    translator.aliases.push(alias);
                }
            }
        }
        translator
    }

    /// Process-wide translator holding the built-in tables
    pub fn builtin() -> &'static Translator {
        static BUILTIN: OnceLock<Translator> = OnceLock::new();
        BUILTIN.get_or_init(|| Translator::new(builtin_aliases()))
    }

    /// Alias tables in declaration order
    pub fn aliases(&self) -> &[CommandAlias] {
        &self.aliases
    }

    /// Look up the alias table of a legacy command
    pub fn alias(&self, name: &str) -> Option<&CommandAlias> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&pos| &self.aliases[pos])
    }

    /// Whether the name is a known legacy command
    pub fn is_legacy(&self, name: &str) -> bool {
        self.alias(name).is_some()
    }

    /// Translate a legacy command into its target dispatches
    pub fn translate(
        &self,
        name: &str,
        supplied: &InvocationContext,
    ) -> std::result::Result<Translation, TranslateError> {
        let alias = self
            .alias(name)
            .ok_or_else(|| TranslateError::UnknownCommand {
                name: name.to_string(),
            })?;

        let recognized = alias.recognized_params();
        let ignored: Vec<&str> = supplied
            .iter()
            .map(|(n, _)| n)
            .filter(|n| !recognized.iter().any(|r| r.eq_ignore_ascii_case(n)))
            .collect();
        if !ignored.is_empty() {
            debug!(command = %alias.name, ?ignored, "ignoring unrecognized parameters");
        }

        let mut primary = Dispatch::new(&alias.target);
        apply_rules(&mut primary, &alias.rules, supplied);
        apply_fixed(&mut primary, &alias.fixed);

        let mut dispatches = Vec::with_capacity(alias.chained.len());
        for chained in alias.chained.iter().filter(|c| c.is_triggered(supplied)) {
            let mut dispatch = Dispatch::new(&chained.target);
            for name in &chained.carry {
                if let Some(value) = primary.get(name) {
                    dispatch.set_if_absent(name, value);
                }
            }
            apply_rules(&mut dispatch, &chained.rules, supplied);
            apply_fixed(&mut dispatch, &chained.fixed);
            trace!(command = %alias.name, chained = %dispatch, "chained dispatch triggered");
            dispatches.push(dispatch);
        }

        debug!(
            command = %alias.name,
            target = %alias.target,
            dispatches = dispatches.len() + 1,
            "translated legacy command"
        );

        Ok(Translation {
            source: alias.name.clone(),
            chained: dispatches,
            primary,
        })
    }

    /// Translate a legacy command and invoke its dispatches in order
    ///
    /// Stops at the first executor failure. Returns the number of dispatches
    /// carried out.
    pub fn dispatch<E>(
        &self,
        name: &str,
        supplied: &InvocationContext,
        executor: &mut E,
    ) -> Result<usize>
    where
        E: CommandExecutor + ?Sized,
    {
        let translation = self.translate(name, supplied)?;
        run(&translation, executor)
    }

    /// Parse a text line and translate it when it is a legacy command
    ///
    /// Returns `Ok(None)` for blank lines and for commands that have no alias.
    pub fn translate_line(&self, line: &str) -> Result<Option<Translation>> {
        let Some(command) = CommandLine::parse(line)? else {
            return Ok(None);
        };
        if !self.is_legacy(&command.name) {
            return Ok(None);
        }
        Ok(Some(self.translate(&command.name, &command.params)?))
    }

    /// Parse, translate and invoke a text line
    ///
    /// Returns `Ok(None)` when the line is not a legacy command, otherwise
    /// the number of dispatches carried out.
    pub fn dispatch_line<E>(&self, line: &str, executor: &mut E) -> Result<Option<usize>>
    where
        E: CommandExecutor + ?Sized,
    {
        match self.translate_line(line)? {
            Some(translation) => run(&translation, executor).map(Some),
            None => Ok(None),
        }
    }
}

fn run<E>(translation: &Translation, executor: &mut E) -> Result<usize>
where
    E: CommandExecutor + ?Sized,
{
    for dispatch in translation.dispatches() {
        executor.execute(dispatch)?;
    }
    Ok(translation.dispatch_count())
}

/// Apply rules in precedence order; the first rule to fire for a target wins
fn apply_rules(dispatch: &mut Dispatch, rules: &[ParameterRule], supplied: &InvocationContext) {
    for rule in rules {
        let Some(raw) = supplied.get(&rule.source) else {
            continue;
        };
        let value = rule.transform.apply(raw);
        if dispatch.set_if_absent(&rule.target, value) {
            trace!(source = %rule.source, target = %rule.target, "rule fired");
        } else {
            trace!(
                source = %rule.source,
                target = %rule.target,
                "shadowed by higher precedence rule"
            );
        }
    }
}

fn apply_fixed(dispatch: &mut Dispatch, fixed: &[(String, String)]) {
    for (name, value) in fixed {
        dispatch.set_if_absent(name, value.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{ChainedDispatch, ValueTransform};
    use crate::dispatch::RecordingExecutor;
    use crate::error::{Error, ExecutorError};

    fn fan_alias() -> CommandAlias {
        CommandAlias::new("M106", "FAN")
            .rule(ParameterRule::passthrough("P"))
            .rule(ParameterRule::new("T", "P"))
            .rule(ParameterRule::passthrough("S"))
    }

    #[test]
    fn test_unknown_command() {
        let translator = Translator::new([fan_alias()]);
        let err = translator
            .translate("M999", &InvocationContext::new())
            .unwrap_err();
        assert_eq!(
            err,
            TranslateError::UnknownCommand {
                name: "M999".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let translator = Translator::new([fan_alias()]);
        assert!(translator.is_legacy("m106"));
        assert!(!translator.is_legacy("M107"));
    }

    #[test]
    fn test_precedence_group() {
        let translator = Translator::new([fan_alias()]);
        let supplied = InvocationContext::from_pairs([("T", "3"), ("P", "1")]);
        let translation = translator.translate("M106", &supplied).unwrap();
        assert_eq!(translation.primary().to_string(), "FAN P=1");
    }

    #[test]
    fn test_later_alias_replaces_earlier() {
        let replacement = CommandAlias::new("m106", "OTHER_FAN");
        let translator = Translator::new([fan_alias(), replacement]);
        assert_eq!(translator.aliases().len(), 1);
        let translation = translator
            .translate("M106", &InvocationContext::new())
            .unwrap();
        assert_eq!(translation.primary().command, "OTHER_FAN");
    }

    #[test]
    fn test_fixed_and_transform() {
        let alias = CommandAlias::new("M107", "FAN")
            .rule(ParameterRule::passthrough("P"))
            .rule(
                ParameterRule::new("S", "S")
                    .with_transform(ValueTransform::DefaultIfEmpty("1".to_string())),
            )
            .fixed("S", "0");
        let translator = Translator::new([alias]);

        let empty_s = InvocationContext::from_pairs([("S", "")]);
        let translation = translator.translate("M107", &empty_s).unwrap();
        assert_eq!(translation.primary().to_string(), "FAN S=1");

        let translation = translator
            .translate("M107", &InvocationContext::new())
            .unwrap();
        assert_eq!(translation.primary().to_string(), "FAN S=0");
    }

    #[test]
    fn test_chained_carries_resolved_target() {
        let alias = CommandAlias::new("WAIT", "DO_WAIT")
            .rule(ParameterRule::new("P", "T"))
            .rule(ParameterRule::passthrough("T"))
            .chain(
                ChainedDispatch::new("DO_SET")
                    .requires("S")
                    .requires_any_of(["T", "P"])
                    .carry("T")
                    .rule(ParameterRule::new("S", "ACTV_TMP"))
                    .fixed("CHNG_STATE", "2"),
            );
        let translator = Translator::new([alias]);
        let supplied = InvocationContext::from_pairs([("S", "200"), ("P", "4"), ("T", "9")]);
        let translation = translator.translate("WAIT", &supplied).unwrap();
        assert_eq!(
            translation.lines(),
            vec!["DO_SET T=4 ACTV_TMP=200 CHNG_STATE=2", "DO_WAIT T=4"]
        );
        assert_eq!(translation.chained().len(), 1);
        assert_eq!(translation.dispatch_count(), 2);
        assert_eq!(translation.source(), "WAIT");
    }

    #[test]
    fn test_translation_without_chained_dispatch() {
        let translator = Translator::builtin();
        let translation = translator
            .translate("m109", &InvocationContext::from_pairs([("S", "200")]))
            .unwrap();
        assert!(translation.chained().is_empty());
        assert_eq!(translation.dispatch_count(), 1);
        assert_eq!(translation.source(), "M109");
        assert_eq!(
            translation.dispatches().collect::<Vec<_>>(),
            vec![translation.primary()]
        );
    }

    struct FailingExecutor {
        calls: usize,
    }

    impl CommandExecutor for FailingExecutor {
        fn execute(&mut self, dispatch: &Dispatch) -> std::result::Result<(), ExecutorError> {
            self.calls += 1;
            Err(ExecutorError::Rejected {
                command: dispatch.command.clone(),
                reason: "printer busy".to_string(),
            })
        }
    }

    #[test]
    fn test_dispatch_stops_on_executor_error() {
        let translator = Translator::builtin();
        let supplied = InvocationContext::from_pairs([("S", "200"), ("T", "0")]);
        let mut executor = FailingExecutor { calls: 0 };
        let err = translator
            .dispatch("M109", &supplied, &mut executor)
            .unwrap_err();
        assert!(matches!(err, Error::Executor(_)));
        assert_eq!(executor.calls, 1);
    }

    #[test]
    fn test_dispatch_line() {
        let translator = Translator::builtin();
        let mut recorder = RecordingExecutor::new();

        let count = translator.dispatch_line("M106 S255", &mut recorder).unwrap();
        assert_eq!(count, Some(1));

        let count = translator.dispatch_line("G28 X", &mut recorder).unwrap();
        assert_eq!(count, None);

        let count = translator.dispatch_line("   ", &mut recorder).unwrap();
        assert_eq!(count, None);

        assert_eq!(recorder.lines(), vec!["KTC_SET_AND_SAVE_PARTFAN_SPEED S=255"]);
    }
}
