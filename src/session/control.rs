use crate::protocol::SEGMENT_DELIMITER;

const PAUSE_PHRASE: &str = "can i have a break";
const RESUME_PHRASE: &str = "ok let's continue";

/// Session control derived from a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    None,
}

impl ControlCommand {
    /// Case-insensitive phrase match. The pause phrase wins; the resume
    /// phrase only counts while `paused`.
    pub fn detect(text: &str, paused: bool) -> Self {
        let lowered = text.to_lowercase();
        if lowered.contains(PAUSE_PHRASE) {
            ControlCommand::Pause
        } else if paused && lowered.contains(RESUME_PHRASE) {
            ControlCommand::Resume
        } else {
            ControlCommand::None
        }
    }
}

/// The part of a response before the first `---`, i.e. the English half.
pub fn first_segment(text: &str) -> &str {
    text.split(SEGMENT_DELIMITER).next().unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_phrase_is_case_insensitive() {
        assert_eq!(
            ControlCommand::detect("Can I have a break, sure.", false),
            ControlCommand::Pause
        );
        assert_eq!(
            ControlCommand::detect("CAN I HAVE A BREAK", true),
            ControlCommand::Pause
        );
    }

    #[test]
    fn resume_only_counts_while_paused() {
        assert_eq!(
            ControlCommand::detect("OK let's continue now", true),
            ControlCommand::Resume
        );
        assert_eq!(
            ControlCommand::detect("OK let's continue now", false),
            ControlCommand::None
        );
    }

    #[test]
    fn pause_wins_over_resume() {
        assert_eq!(
            ControlCommand::detect("ok let's continue... can i have a break?", true),
            ControlCommand::Pause
        );
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(
            ControlCommand::detect("Great job! Score: 85", false),
            ControlCommand::None
        );
    }

    #[test]
    fn first_segment_splits_on_delimiter() {
        assert_eq!(first_segment("Hello---Olá"), "Hello");
        assert_eq!(first_segment("  Hi there \n---\nOi\n---\nmais"), "Hi there");
        assert_eq!(first_segment("No delimiter"), "No delimiter");
        assert_eq!(first_segment("---só português"), "");
    }
}
