bitflags::bitflags! {
    /// Characteristic properties ([Vol 3] Part G, Section 3.3.1.1). These are
    /// informational. Handles do not check them before issuing requests.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[repr(transparent)]
    pub struct CharProp: u8 {
        /// Permits broadcasts of the Characteristic Value using Server
        /// Characteristic Configuration Descriptor.
        const BROADCAST = 0x01;
        /// Permits reads of the Characteristic Value.
        const READ = 0x02;
        /// Permits writes of the Characteristic Value without response.
        const WRITE_CMD = 0x04;
        /// Permits writes of the Characteristic Value with response.
        const WRITE_REQ = 0x08;
        /// Permits notifications of a Characteristic Value without
        /// acknowledgment.
        const NOTIFY = 0x10;
        /// Permits indications of a Characteristic Value with acknowledgment.
        const INDICATE = 0x20;
        /// Permits signed writes to the Characteristic Value.
        const WRITE_SIGNED_CMD = 0x40;
        /// Additional characteristic properties are defined in the
        /// Characteristic Extended Properties Descriptor.
        const EXT_PROPS = 0x80;
    }
}

impl CharProp {
    /// Transport names of each property bit in ascending bit order.
    const NAMES: [(Self, &'static str); 8] = [
        (Self::BROADCAST, "broadcast"),
        (Self::READ, "read"),
        (Self::WRITE_CMD, "writeWithoutResponse"),
        (Self::WRITE_REQ, "write"),
        (Self::NOTIFY, "notify"),
        (Self::INDICATE, "indicate"),
        (Self::WRITE_SIGNED_CMD, "authenticatedSignedWrites"),
        (Self::EXT_PROPS, "extendedProperties"),
    ];

    /// Returns the transport names of all set properties in ascending bit
    /// order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        (Self::NAMES.iter())
            .filter_map(|&(p, name)| self.contains(p).then_some(name))
            .collect()
    }

    /// Parses properties from their transport names. Unknown names are
    /// ignored.
    #[must_use]
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(Self::empty(), |acc, name| {
            (Self::NAMES.iter())
                .find(|&&(_, n)| n == name)
                .map_or(acc, |&(p, _)| acc | p)
        })
    }
}
