use super::{Lifecycle, SessionState, SmartSession};
use crate::codec::ata::{self, SMART_DATA_LEN};
use crate::error::Result;
use crate::models::smart::{SmartAttribute, SmartId};
use tracing::debug;

/// Backend transport able to fetch the 512-byte SMART READ DATA response.
pub trait AtaChannel: Send {
    fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()>;

    /// Release the native resources. Must tolerate repeated calls.
    fn close(&mut self);
}

/// Attribute-table view of an ATA-style session.
pub trait SmartGeneric {
    fn supported_ids(&self) -> Vec<SmartId>;
    fn attribute(&self, id: SmartId) -> Option<SmartAttribute>;
}

/// ATA SMART session: owns the channel and the latest response buffer.
pub struct GenericSmart {
    channel:   Box<dyn AtaChannel>,
    data:      Box<[u8; SMART_DATA_LEN]>,
    lifecycle: Lifecycle,
}

impl GenericSmart {
    pub fn new(channel: Box<dyn AtaChannel>) -> Self {
        Self { channel, data: Box::new([0; SMART_DATA_LEN]), lifecycle: Lifecycle::opened() }
    }

    /// Every populated attribute, decoded from the current buffer.
    pub fn attributes(&self) -> Vec<SmartAttribute> {
        self.lifecycle.assert_open("attributes");
        ata::attributes(self.data.as_slice())
    }

    /// The raw response from the last successful `update()`.
    pub fn data(&self) -> &[u8; SMART_DATA_LEN] {
        &self.data
    }
}

impl SmartGeneric for GenericSmart {
    fn supported_ids(&self) -> Vec<SmartId> {
        self.lifecycle.assert_open("supported_ids");
        ata::supported_ids(self.data.as_slice())
    }

    fn attribute(&self, id: SmartId) -> Option<SmartAttribute> {
        self.lifecycle.assert_open("attribute");
        ata::attribute(self.data.as_slice(), id)
    }
}

impl SmartSession for GenericSmart {
    fn update(&mut self) -> bool {
        self.lifecycle.assert_open("update");

        let mut fresh = [0u8; SMART_DATA_LEN];
        match self.channel.read_smart_data(&mut fresh) {
            Ok(()) => {
                *self.data = fresh;
                self.lifecycle.record(true)
            }
            Err(e) => {
                debug!(error = %e, "SMART READ DATA failed");
                self.lifecycle.record(false)
            }
        }
    }

    fn last_update(&self) -> bool {
        self.lifecycle.last_update()
    }

    fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    fn close(&mut self) {
        if self.lifecycle.close() {
            self.channel.close();
        }
    }
}

impl Drop for GenericSmart {
    fn drop(&mut self) {
        self.close();
    }
}
