use crate::protocol::InboundFrame;

/// One complete response from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub text: String,
    /// Number of fragments the text was built from
    pub fragments: usize,
}

/// What a single inbound frame did to the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerEvent {
    /// First fragment of a new turn
    Started,
    /// Fragment appended to the turn in progress
    Appended,
    Completed(Turn),
}

/// Accumulates text fragments into turns.
///
/// At most one turn is in progress; it ends on a completion marker (or
/// `reset`) and the next fragment starts a fresh one.
#[derive(Debug, Default)]
pub struct TurnAssembler {
    current: Option<Turn>,
}

impl TurnAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: InboundFrame) -> Option<AssemblerEvent> {
        match frame {
            InboundFrame::TextFragment(text) => match &mut self.current {
                Some(turn) => {
                    turn.text.push_str(&text);
                    turn.fragments += 1;
                    Some(AssemblerEvent::Appended)
                }
                None => {
                    self.current = Some(Turn { text, fragments: 1 });
                    Some(AssemblerEvent::Started)
                }
            },
            InboundFrame::TurnComplete => {
                let turn = self.current.take().unwrap_or(Turn {
                    text: String::new(),
                    fragments: 0,
                });
                Some(AssemblerEvent::Completed(turn))
            }
            InboundFrame::SetupComplete | InboundFrame::Other => None,
        }
    }

    /// Whether a turn is in progress
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Drop any partial turn
    pub fn reset(&mut self) {
        self.current = None;
    }
}
