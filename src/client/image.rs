use bon::bon;

use super::proxy_url;
use crate::resolver::Quality;

/// What a display component shows for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientImageState {
    pub loading: bool,
    pub errored: bool,
    pub current_source: Option<String>,
    pub attempted_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Lazy component not yet in view
    Waiting,
    Loading,
    Loaded,
    Failed,
}

/// Load/error state machine for a proxied image with one fallback source.
///
/// ```text
/// Waiting --visible--> Loading --load--> Loaded
///                         |
///                       error --fallback untried--> Loading (fallback)
///                         |
///                         +--otherwise--> Failed
/// ```
///
/// `Loaded` and `Failed` are terminal; later events are ignored.
#[derive(Debug, Clone)]
pub struct FallbackImage {
    id: Option<String>,
    quality: Quality,
    width: u32,
    height: u32,
    fallback: Option<String>,
    phase: Phase,
    state: ClientImageState,
}

#[bon]
impl FallbackImage {
    #[builder]
    pub fn new(
        #[builder(into)] id: Option<String>,
        #[builder(default = Quality::Thumbnail)] quality: Quality,
        #[builder(default = 400)] width: u32,
        #[builder(default = 400)] height: u32,
        #[builder(into)] fallback: Option<String>,
        #[builder(default = true)] lazy: bool,
    ) -> Self {
        let mut image = Self {
            id,
            quality,
            width,
            height,
            fallback,
            phase: Phase::Waiting,
            state: ClientImageState {
                loading: true,
                errored: false,
                current_source: None,
                attempted_fallback: false,
            },
        };
        if !lazy {
            image.start();
        }
        image
    }
}

impl FallbackImage {
    pub fn state(&self) -> &ClientImageState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Loaded | Phase::Failed)
    }

    /// Viewport intersection; starts a lazy load once
    pub fn on_visible(&mut self) {
        if self.phase == Phase::Waiting {
            self.start();
        }
    }

    pub fn on_load(&mut self) {
        if self.phase != Phase::Loading {
            return;
        }
        self.phase = Phase::Loaded;
        self.state.loading = false;
        self.state.errored = false;
    }

    pub fn on_error(&mut self) {
        if self.phase != Phase::Loading {
            return;
        }

        let next = self
            .fallback
            .as_ref()
            .filter(|_| !self.state.attempted_fallback)
            .filter(|fallback| self.state.current_source.as_ref() != Some(*fallback))
            .cloned();

        match next {
            Some(fallback) => {
                self.state.current_source = Some(fallback);
                self.state.attempted_fallback = true;
                self.state.loading = true;
                self.state.errored = false;
            }
            None => self.fail(),
        }
    }

    fn start(&mut self) {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => {
                self.phase = Phase::Loading;
                self.state.current_source =
                    Some(proxy_url(id, self.quality, self.width, self.height));
            }
            _ => self.fail(),
        }
    }

    fn fail(&mut self) {
        self.phase = Phase::Failed;
        self.state.loading = false;
        self.state.errored = true;
    }
}
