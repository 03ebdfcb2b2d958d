/// What the host loop should do after a tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

impl AppControl {
    #[inline]
    pub fn is_exit(self) -> bool {
        self == AppControl::Exit
    }
}
