// state local to the tui: toggles that change what a key means
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeTarget {
    #[default]
    Track,
    Master,
}

#[derive(Clone, Debug, Default)]
pub struct TuiState {
    // which gain the volume keys move; press 'v' to flip
    pub volume_target: VolumeTarget,
    pub show_help: bool,
}

impl TuiState {
    pub fn toggle_volume_target(&mut self) {
        self.volume_target = match self.volume_target {
            VolumeTarget::Track => VolumeTarget::Master,
            VolumeTarget::Master => VolumeTarget::Track,
        };
    }
}
