use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// On/off flag of the shadow-casting subsystem.
///
/// Tile layers consult it at every flush to choose between the lit and unlit
/// material variants.  Clones share the flag; [`ShadowSwitch::global`] is the
/// process-wide instance used unless a layer is given its own.
#[derive(Clone, Debug, Default)]
pub struct ShadowSwitch(Arc<AtomicBool>);

impl ShadowSwitch {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn global() -> Self {
        static GLOBAL: OnceLock<ShadowSwitch> = OnceLock::new();
        GLOBAL.get_or_init(ShadowSwitch::default).clone()
    }

    pub fn set_active(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
