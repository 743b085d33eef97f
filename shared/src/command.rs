//! Command codes carried in the first byte of a request

use std::fmt;

/// A request the listener knows how to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Publish the "lab open" status
    Open = 0xff,
    /// Publish the "lab closed" status
    Close = 0x00,
    /// Publish the "out for coffee" status
    Coffee = 0xcc,
    /// Publish the "lab is on fire" status
    Fire = 0xf1,
    /// Generate and return a new shared secret
    KeyRotate = 0xaa,
}

impl Command {
    /// All commands, in wire-byte order of declaration
    pub const ALL: [Command; 5] = [
        Command::Open,
        Command::Close,
        Command::Coffee,
        Command::Fire,
        Command::KeyRotate,
    ];

    /// The byte that encodes this command on the wire
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in logs and on the client command line
    pub fn name(self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Close => "close",
            Command::Coffee => "coffee",
            Command::Fire => "fire",
            Command::KeyRotate => "rotate",
        }
    }
}

impl TryFrom<u8> for Command {
    /// The unrecognized byte
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0xff => Ok(Command::Open),
            0x00 => Ok(Command::Close),
            0xcc => Ok(Command::Coffee),
            0xf1 => Ok(Command::Fire),
            0xaa => Ok(Command::KeyRotate),
            other => Err(other),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::Open.as_byte(), 0xff);
        assert_eq!(Command::Close.as_byte(), 0x00);
        assert_eq!(Command::Coffee.as_byte(), 0xcc);
        assert_eq!(Command::KeyRotate.as_byte(), 0xaa);
    }

    #[test]
    fn test_try_from_known_bytes() {
        for command in Command::ALL {
            assert_eq!(Command::try_from(command.as_byte()), Ok(command));
        }
    }

    #[test]
    fn test_try_from_unknown_byte() {
        assert_eq!(Command::try_from(0x69), Err(0x69));
        assert_eq!(Command::try_from(0x55), Err(0x55));
    }

    #[test]
    fn test_command_bytes_are_distinct() {
        let mut bytes: Vec<u8> = Command::ALL.iter().map(|c| c.as_byte()).collect();
        bytes.sort_unstable();
        bytes.dedup();
        assert_eq!(bytes.len(), Command::ALL.len());
    }
}
