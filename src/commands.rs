//! The two SD command tables the card answers to.
//!
//! Commands arrive as a 6-bit index plus a 32-bit argument; CMD55 arms
//! the card so that the next index is first tried against the
//! application-specific table.

/// Standard commands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// CMD0: software reset, back to the idle state
    GoIdleState,
    /// CMD2: send card identification (native bus only)
    AllSendCid,
    /// CMD3: publish the relative card address (native bus only)
    SendRelativeAddr,
    /// CMD7: select/deselect card (native bus only)
    SelectCard,
    /// CMD8: send interface condition
    SendIfCond,
    /// CMD9: send card specific data
    SendCsd,
    /// CMD12: stop an in-flight transmission
    StopTransmission,
    /// CMD13: send status register
    SendStatus,
    /// CMD16: set block length
    SetBlocklen,
    /// CMD17: read a single block
    ReadSingleBlock,
    /// CMD18: read multiple blocks (native bus only)
    ReadMultipleBlock,
    /// CMD24: write a single block (native bus only)
    WriteBlock,
    /// CMD55: next command is application specific
    AppCmd,
    /// CMD58: read the operating conditions register
    ReadOcr,
}

impl Command {
    pub fn from_index(index: u8) -> Option<Self> {
        let command = match index {
            0 => Command::GoIdleState,
            2 => Command::AllSendCid,
            3 => Command::SendRelativeAddr,
            7 => Command::SelectCard,
            8 => Command::SendIfCond,
            9 => Command::SendCsd,
            12 => Command::StopTransmission,
            13 => Command::SendStatus,
            16 => Command::SetBlocklen,
            17 => Command::ReadSingleBlock,
            18 => Command::ReadMultipleBlock,
            24 => Command::WriteBlock,
            55 => Command::AppCmd,
            58 => Command::ReadOcr,
            _ => return None,
        };
        Some(command)
    }
}

/// Application-specific commands, only valid right after CMD55.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AppCommand {
    /// ACMD13: send the SD status register
    SdStatus,
    /// ACMD41: send operating conditions, ends the idle phase
    SdSendOpCond,
    /// ACMD51: send the SD configuration register
    SendScr,
}

impl AppCommand {
    pub fn from_index(index: u8) -> Option<Self> {
        let command = match index {
            13 => AppCommand::SdStatus,
            41 => AppCommand::SdSendOpCond,
            51 => AppCommand::SendScr,
            _ => return None,
        };
        Some(command)
    }
}
