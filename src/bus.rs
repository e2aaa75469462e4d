//! Canonical bus classification.
//!
//! Each backend reports its transport differently: Linux as a short transport
//! name derived from sysfs, macOS as the `Physical Interconnect` string of the
//! protocol characteristics dictionary, Windows as a `STORAGE_BUS_TYPE` value.
//! All three go through exact lookup tables; anything unlisted is `Unknown`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum BusType {
    #[default]
    Unknown,
    Scsi,
    Atapi,
    Ata,
    Ieee1394,
    Ssa,
    FibreChannel,
    Usb,
    Raid,
    Iscsi,
    Sas,
    Sata,
    Sd,
    Mmc,
    Virtual,
    FileBackedVirtual,
    Spaces,
    Nvme,
    Scm,
    Ufs,
    PciExpress,
    AppleFabric,
    Thunderbolt,
}

/// How a disk's health data is read, fixed once at enumeration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SmartType {
    Unsupported,
    /// ATA-style attribute table.
    Generic,
    Nvme,
}

/// Which session flavour the enumerator should attempt for a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    None,
    Ata,
    /// ATA commands tunnelled through SCSI; must prove itself with one read.
    UsbAta,
    Nvme,
}

impl BusType {
    pub fn label(&self) -> &'static str {
        match self {
            BusType::Unknown           => "Unknown",
            BusType::Scsi              => "SCSI",
            BusType::Atapi             => "ATAPI",
            BusType::Ata               => "ATA",
            BusType::Ieee1394          => "FireWire",
            BusType::Ssa               => "SSA",
            BusType::FibreChannel      => "Fibre Channel",
            BusType::Usb               => "USB",
            BusType::Raid              => "RAID",
            BusType::Iscsi             => "iSCSI",
            BusType::Sas               => "SAS",
            BusType::Sata              => "SATA",
            BusType::Sd                => "SD",
            BusType::Mmc               => "MMC",
            BusType::Virtual           => "Virtual",
            BusType::FileBackedVirtual => "File-backed virtual",
            BusType::Spaces            => "Storage Spaces",
            BusType::Nvme              => "NVMe",
            BusType::Scm               => "SCM",
            BusType::Ufs               => "UFS",
            BusType::PciExpress        => "PCI-Express",
            BusType::AppleFabric       => "Apple Fabric",
            BusType::Thunderbolt       => "Thunderbolt",
        }
    }

    pub fn session_kind(&self) -> SessionKind {
        match self {
            BusType::Nvme | BusType::PciExpress | BusType::AppleFabric => SessionKind::Nvme,
            BusType::Ata | BusType::Sata | BusType::Atapi              => SessionKind::Ata,
            BusType::Usb                                               => SessionKind::UsbAta,
            _                                                          => SessionKind::None,
        }
    }
}

impl SmartType {
    pub fn label(&self) -> &'static str {
        match self {
            SmartType::Unsupported => "unsupported",
            SmartType::Generic     => "ATA",
            SmartType::Nvme        => "NVMe",
        }
    }
}

/// Transport names as derived from sysfs (the same vocabulary `lsblk -o TRAN` uses).
const LINUX_TRANSPORTS: &[(&str, BusType)] = &[
    ("sata",  BusType::Sata),
    ("ata",   BusType::Ata),
    ("pata",  BusType::Ata),
    ("atapi", BusType::Atapi),
    ("nvme",  BusType::Nvme),
    ("usb",   BusType::Usb),
    ("sas",   BusType::Sas),
    ("scsi",  BusType::Scsi),
    ("spi",   BusType::Scsi),
    ("iscsi", BusType::Iscsi),
    ("fc",    BusType::FibreChannel),
    ("ieee1394", BusType::Ieee1394),
    ("mmc",   BusType::Mmc),
    ("virtio", BusType::Virtual),
    ("ufs",   BusType::Ufs),
];

/// `Physical Interconnect` values from the I/O Kit protocol characteristics.
const MACOS_INTERCONNECTS: &[(&str, BusType)] = &[
    ("SATA",              BusType::Sata),
    ("ATA",               BusType::Ata),
    ("ATAPI",             BusType::Atapi),
    ("USB",               BusType::Usb),
    ("FireWire",          BusType::Ieee1394),
    ("SCSI",              BusType::Scsi),
    ("SAS",               BusType::Sas),
    ("Fibre Channel",     BusType::FibreChannel),
    ("PCI-Express",       BusType::PciExpress),
    ("PCI",               BusType::PciExpress),
    ("NVMe",              BusType::Nvme),
    ("Apple Fabric",      BusType::AppleFabric),
    ("Thunderbolt",       BusType::Thunderbolt),
    ("Secure Digital",    BusType::Sd),
    ("Virtual Interface", BusType::Virtual),
    ("Disk Image",        BusType::FileBackedVirtual),
];

/// `STORAGE_BUS_TYPE` values, in declaration order of the Windows storage stack.
const WINDOWS_BUS_TYPES: &[(u32, BusType)] = &[
    (0x00, BusType::Unknown),
    (0x01, BusType::Scsi),
    (0x02, BusType::Atapi),
    (0x03, BusType::Ata),
    (0x04, BusType::Ieee1394),
    (0x05, BusType::Ssa),
    (0x06, BusType::FibreChannel),
    (0x07, BusType::Usb),
    (0x08, BusType::Raid),
    (0x09, BusType::Iscsi),
    (0x0A, BusType::Sas),
    (0x0B, BusType::Sata),
    (0x0C, BusType::Sd),
    (0x0D, BusType::Mmc),
    (0x0E, BusType::Virtual),
    (0x0F, BusType::FileBackedVirtual),
    (0x10, BusType::Spaces),
    (0x11, BusType::Nvme),
    (0x12, BusType::Scm),
    (0x13, BusType::Ufs),
];

pub fn classify_linux(transport: &str) -> BusType {
    lookup(LINUX_TRANSPORTS, transport)
}

pub fn classify_macos(interconnect: &str) -> BusType {
    lookup(MACOS_INTERCONNECTS, interconnect)
}

pub fn classify_windows(bus_type: u32) -> BusType {
    WINDOWS_BUS_TYPES
        .iter()
        .find(|(k, _)| *k == bus_type)
        .map(|(_, v)| *v)
        .unwrap_or(BusType::Unknown)
}

fn lookup(table: &[(&str, BusType)], key: &str) -> BusType {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(BusType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_maps_to_its_value() {
        for (k, v) in LINUX_TRANSPORTS {
            assert_eq!(classify_linux(k), *v, "linux {k}");
        }
        for (k, v) in MACOS_INTERCONNECTS {
            assert_eq!(classify_macos(k), *v, "macos {k}");
        }
        for (k, v) in WINDOWS_BUS_TYPES {
            assert_eq!(classify_windows(*k), *v, "windows {k:#x}");
        }
    }

    #[test]
    fn unknown_inputs_never_guess() {
        assert_eq!(classify_linux(""), BusType::Unknown);
        assert_eq!(classify_linux("SATA"), BusType::Unknown);
        assert_eq!(classify_linux("nvme0"), BusType::Unknown);
        assert_eq!(classify_macos("sata"), BusType::Unknown);
        assert_eq!(classify_macos("Bluetooth"), BusType::Unknown);
        assert_eq!(classify_windows(0x14), BusType::Unknown);
        assert_eq!(classify_windows(u32::MAX), BusType::Unknown);
    }

    #[test]
    fn session_kind_follows_bus() {
        assert_eq!(BusType::Nvme.session_kind(), SessionKind::Nvme);
        assert_eq!(BusType::PciExpress.session_kind(), SessionKind::Nvme);
        assert_eq!(BusType::Sata.session_kind(), SessionKind::Ata);
        assert_eq!(BusType::Atapi.session_kind(), SessionKind::Ata);
        assert_eq!(BusType::Usb.session_kind(), SessionKind::UsbAta);
        assert_eq!(BusType::Sas.session_kind(), SessionKind::None);
        assert_eq!(BusType::Unknown.session_kind(), SessionKind::None);
    }
}
