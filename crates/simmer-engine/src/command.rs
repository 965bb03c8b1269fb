//! Command-line parsing.
//!
//! ```text
//! simmer-engine [status]
//! simmer-engine cook <recipe name...>
//! simmer-engine cook-index <n>
//! simmer-engine pause
//! simmer-engine resume
//! ```

use crate::error::EngineError;

/// What the operator asked the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report the session, energy, and inventory, then wait out a running
    /// session.
    Status,
    /// Start cooking the recipe with this name.
    Cook {
        /// Recipe name; multiple words are joined with spaces.
        recipe: String,
    },
    /// Start cooking the recipe at this catalog position (clamped).
    CookIndex {
        /// Zero-based catalog position.
        index: usize,
    },
    /// Pause the running session.
    Pause,
    /// Resume the paused session.
    Resume,
}

impl Command {
    /// Whether the poll loop should run after the command.
    pub const fn waits_for_completion(&self) -> bool {
        !matches!(self, Self::Pause)
    }

    /// Parse the arguments after the program name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Usage`] for an unknown verb, a missing or
    /// malformed operand, or trailing arguments.
    pub fn parse<I, S>(args: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let Some((verb, rest)) = args.split_first() else {
            return Ok(Self::Status);
        };

        match verb.as_str() {
            "status" => no_operands(verb, rest).map(|()| Self::Status),
            "pause" => no_operands(verb, rest).map(|()| Self::Pause),
            "resume" => no_operands(verb, rest).map(|()| Self::Resume),
            "cook" => {
                let recipe = rest.join(" ");
                if recipe.trim().is_empty() {
                    return Err(usage("cook needs a recipe name"));
                }
                Ok(Self::Cook { recipe })
            }
            "cook-index" => match rest {
                [n] => n
                    .parse::<usize>()
                    .map(|index| Self::CookIndex { index })
                    .map_err(|e| usage(&format!("cook-index needs a number, got {n:?}: {e}"))),
                _ => Err(usage("cook-index takes exactly one number")),
            },
            other => Err(usage(&format!("unknown command {other:?}"))),
        }
    }
}

fn no_operands(verb: &str, rest: &[String]) -> Result<(), EngineError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(usage(&format!("{verb} takes no arguments")))
    }
}

fn usage(message: &str) -> EngineError {
    EngineError::Usage {
        message: message.to_owned(),
    }
}
