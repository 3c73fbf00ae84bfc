/// Detected terminal multiplexer environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEnvironment {
    Tmux,
    Plain,
}

impl TerminalEnvironment {
    /// Detect the current terminal environment from env vars.
    pub fn detect() -> Self {
        Self::from_tmux_var(std::env::var_os("TMUX").is_some())
    }

    fn from_tmux_var(tmux_set: bool) -> Self {
        if tmux_set {
            Self::Tmux
        } else {
            Self::Plain
        }
    }
}
