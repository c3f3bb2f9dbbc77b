use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// POSIX permission bits in the standard binary mode layout.
    ///
    /// Indexed little-endian: bit 0 is others-execute, bit 8 is
    /// owner-read. Mode `0o644` therefore sets owner-read, owner-write,
    /// group-read and others-read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PosixPermissions: u16 {
        const OTHERS_EXECUTE = 0o001;
        const OTHERS_WRITE = 0o002;
        const OTHERS_READ = 0o004;
        const GROUP_EXECUTE = 0o010;
        const GROUP_WRITE = 0o020;
        const GROUP_READ = 0o040;
        const OWNER_EXECUTE = 0o100;
        const OWNER_WRITE = 0o200;
        const OWNER_READ = 0o400;
    }
}

impl PosixPermissions {
    /// Decode a numeric file mode. Returns `None` if bits outside the
    /// nine permission bits are set.
    pub fn from_mode(mode: u32) -> Option<Self> {
        u16::try_from(mode).ok().and_then(Self::from_bits)
    }

    /// The numeric file mode (`0..=0o777`).
    pub fn mode(self) -> u32 {
        u32::from(self.bits())
    }
}

/// Renders in `ls -l` style, e.g. `rw-r--r--`.
impl fmt::Display for PosixPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = [
            (Self::OWNER_READ, 'r'),
            (Self::OWNER_WRITE, 'w'),
            (Self::OWNER_EXECUTE, 'x'),
            (Self::GROUP_READ, 'r'),
            (Self::GROUP_WRITE, 'w'),
            (Self::GROUP_EXECUTE, 'x'),
            (Self::OTHERS_READ, 'r'),
            (Self::OTHERS_WRITE, 'w'),
            (Self::OTHERS_EXECUTE, 'x'),
        ];
        for (bit, mark) in cells {
            write!(f, "{}", if self.contains(bit) { mark } else { '-' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_644_maps_to_expected_bits() {
        let permissions = PosixPermissions::from_mode(0o644).unwrap();
        assert_eq!(
            permissions,
            PosixPermissions::OWNER_READ
                | PosixPermissions::OWNER_WRITE
                | PosixPermissions::GROUP_READ
                | PosixPermissions::OTHERS_READ
        );
        assert_eq!(permissions.mode(), 0o644);
    }

    #[test]
    fn mode_round_trips() {
        for mode in [0o000, 0o755, 0o777, 0o111, 0o400] {
            assert_eq!(PosixPermissions::from_mode(mode).unwrap().mode(), mode);
        }
    }

    #[test]
    fn rejects_bits_beyond_permissions() {
        assert!(PosixPermissions::from_mode(0o1644).is_none());
        assert!(PosixPermissions::from_mode(0o40777).is_none());
    }

    #[test]
    fn displays_ls_style() {
        assert_eq!(
            PosixPermissions::from_mode(0o644).unwrap().to_string(),
            "rw-r--r--"
        );
        assert_eq!(
            PosixPermissions::from_mode(0o751).unwrap().to_string(),
            "rwxr-x--x"
        );
        assert_eq!(PosixPermissions::empty().to_string(), "---------");
    }
}
