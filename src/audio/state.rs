//! Audio activation state machine.
//!
//! Platforms refuse audible output until the user interacts with the page or
//! window. The gate models that explicitly: the device's "activation
//! succeeded" is an external event fed in by the caller, never assumed.
//!
//! ```text
//! Uninitialized --LoadingStarted--> Loading --LoadingFinished--> Suspended
//! Suspended --UserGesture--> (request activation) --ActivationSucceeded--> Active
//! Active --Mute--> Suspended (muted; Unmute, then a new gesture, reactivates)
//! ```

/// Activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioState {
    #[default]
    Uninitialized,
    Loading,
    /// Assets settled, waiting for a user gesture and device activation
    Suspended,
    Active,
}

/// Events delivered into the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    LoadingStarted,
    LoadingFinished,
    UserGesture,
    ActivationSucceeded,
    Mute,
    Unmute,
}

/// Side effect the caller must perform after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    None,
    /// Ask the output device to activate now, inside the gesture handler
    RequestActivation,
}

#[derive(Debug, Default)]
pub struct ActivationGate {
    state: AudioState,
    /// A gesture arrived before assets settled
    gesture_pending: bool,
    /// Activation was requested and not yet confirmed
    awaiting_activation: bool,
    muted: bool,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == AudioState::Active
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Apply one event and return the action the caller owes.
    pub fn handle(&mut self, event: AudioEvent) -> GateAction {
        let before = self.state;
        let action = self.transition(event);
        if before != self.state {
            log::info!("Audio state {:?} -> {:?} on {:?}", before, self.state, event);
        }
        action
    }

    fn transition(&mut self, event: AudioEvent) -> GateAction {
        use AudioState::*;

        match (self.state, event) {
            (Uninitialized, AudioEvent::LoadingStarted) => {
                self.state = Loading;
                GateAction::None
            }
            (Uninitialized | Loading, AudioEvent::LoadingFinished) => {
                self.state = Suspended;
                if self.gesture_pending {
                    self.gesture_pending = false;
                    self.request()
                } else {
                    GateAction::None
                }
            }
            (Uninitialized | Loading, AudioEvent::UserGesture) => {
                self.gesture_pending = true;
                GateAction::None
            }
            (Suspended, AudioEvent::UserGesture) => self.request(),
            (Suspended, AudioEvent::ActivationSucceeded) => {
                if self.awaiting_activation && !self.muted {
                    self.awaiting_activation = false;
                    self.state = Active;
                }
                GateAction::None
            }
            (_, AudioEvent::Mute) => {
                self.muted = true;
                self.awaiting_activation = false;
                self.gesture_pending = false;
                if self.state == Active {
                    self.state = Suspended;
                }
                GateAction::None
            }
            (_, AudioEvent::Unmute) => {
                self.muted = false;
                GateAction::None
            }
            _ => GateAction::None,
        }
    }

    fn request(&mut self) -> GateAction {
        if self.muted {
            return GateAction::None;
        }
        self.awaiting_activation = true;
        GateAction::RequestActivation
    }
}
