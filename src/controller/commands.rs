// Micronix MMC instruction set
//
// Every instruction is a 3-letter mnemonic. Framing is:
//   command: <axis><MNE><p1,p2,...>\r
//   query:   <axis><MNE>?\r

use std::fmt;
use std::str::FromStr;

/// Returned when a mnemonic is not part of the instruction set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid command: {0:?} is not a known instruction")]
pub struct UnknownCommand(pub String);

macro_rules! commands {
    ($($variant:ident, $mnemonic:literal, $description:literal;)*) => {
        /// Instruction understood by the controller
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $($variant,)*
        }

        impl Command {
            /// Every instruction, in manual order
            pub const ALL: &'static [Command] = &[$(Command::$variant,)*];

            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Command::$variant => $mnemonic,)*
                }
            }

            pub const fn description(self) -> &'static str {
                match self {
                    $(Command::$variant => $description,)*
                }
            }
        }
    };
}

#[rustfmt::skip]
commands!(
    Acc, "ACC", "Acceleration";
    Aez, "AEZ", "Auto Encoder Zero";
    Anr, "ANR", "Axis Number";
    Bkl, "BKL", "Backlash Compensation";
    Cer, "CER", "Clear Errors";
    Dat, "DAT", "Trace Data";
    Dbd, "DBD", "Closed Loop Deadband";
    Dec, "DEC", "Deceleration";
    Def, "DEF", "Restore Factory Defaults";
    Ead, "EAD", "Encoder Mode (Analog/Digital)";
    Enc, "ENC", "Encoder Resolution";
    End, "END", "End Program Recording";
    Epl, "EPL", "Encoder Polarity";
    Era, "ERA", "Erase Program";
    Err, "ERR", "Read and Clear Errors";
    Est, "EST", "Emergency Stop";
    Exc, "EXC", "Execute Program";
    Fbk, "FBK", "Feedback Mode";
    Hcg, "HCG", "Home Configuration";
    Hom, "HOM", "Home";
    Idx, "IDX", "Index Position";
    Jac, "JAC", "Jog Acceleration";
    Jog, "JOG", "Jog Mode";
    Lcg, "LCG", "Limit Configuration";
    Ldr, "LDR", "Limit Direction";
    Lpl, "LPL", "Limit Polarity";
    Mln, "MLN", "Move to Negative Limit";
    Mlp, "MLP", "Move to Positive Limit";
    Mot, "MOT", "Motor On/Off";
    Mpl, "MPL", "Motor Polarity";
    Msa, "MSA", "Synchronous Move Absolute";
    Msr, "MSR", "Synchronous Move Relative";
    Mva, "MVA", "Move Absolute";
    Mvr, "MVR", "Move Relative";
    Pgl, "PGL", "Loop Program";
    Pgm, "PGM", "Begin Program Recording";
    Pgs, "PGS", "Run Program at Startup";
    Pos, "POS", "Position";
    Rez, "REZ", "Motor Resolution";
    Rst, "RST", "Reset Controller";
    Run, "RUN", "Run Synchronous Move";
    Sav, "SAV", "Save Axis Settings";
    Sln, "SLN", "Negative Soft Limit";
    Slp, "SLP", "Positive Soft Limit";
    Sta, "STA", "Status Byte";
    Stp, "STP", "Stop Motion";
    Syn, "SYN", "Synchronous Move Setup";
    Tla, "TLA", "Soft Travel Limit Enable";
    Tra, "TRA", "Trace";
    Trg, "TRG", "Trigger Input";
    Vel, "VEL", "Velocity";
    Ver, "VER", "Firmware Version";
    Vmx, "VMX", "Maximum Velocity";
    Wst, "WST", "Wait for Stop";
    Wtm, "WTM", "Wait Time";
    Zro, "ZRO", "Zero Position";
    Zzz, "ZZZ", "Quick Save";
);

impl Command {
    /// Look up an instruction by its exact mnemonic
    pub fn lookup(mnemonic: &str) -> Result<Command, UnknownCommand> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.mnemonic() == mnemonic)
            .ok_or_else(|| UnknownCommand(mnemonic.to_string()))
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    // `Self::Err` would collide with the `ERR` instruction variant
    fn from_str(s: &str) -> Result<Self, UnknownCommand> {
        Command::lookup(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Anything the session accepts in the command position.
///
/// Typed [`Command`]s always resolve; strings go through the catalog so that
/// unknown mnemonics are rejected before a single byte hits the wire.
pub trait ToCommand {
    fn to_command(&self) -> Result<Command, UnknownCommand>;
}

impl ToCommand for Command {
    fn to_command(&self) -> Result<Command, UnknownCommand> {
        Ok(*self)
    }
}

impl ToCommand for str {
    fn to_command(&self) -> Result<Command, UnknownCommand> {
        Command::lookup(self)
    }
}

impl ToCommand for String {
    fn to_command(&self) -> Result<Command, UnknownCommand> {
        Command::lookup(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mnemonics_are_three_ascii_letters() {
        for cmd in Command::ALL {
            let m = cmd.mnemonic();
            assert_eq!(m.len(), 3, "{:?} has mnemonic {:?}", cmd, m);
            assert!(
                m.chars().all(|c| c.is_ascii_alphabetic()),
                "{:?} has non-letter mnemonic {:?}",
                cmd,
                m
            );
        }
    }

    #[test]
    fn test_mnemonics_are_unique() {
        let seen: HashSet<_> = Command::ALL.iter().map(|c| c.mnemonic()).collect();
        assert_eq!(seen.len(), Command::ALL.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Command::lookup("MVA"), Ok(Command::Mva));
        assert_eq!("POS".parse::<Command>(), Ok(Command::Pos));
        assert_eq!(Command::Mva.description(), "Move Absolute");
        assert_eq!(Command::Mot.to_string(), "MOT");
    }

    #[test]
    fn test_lookup_rejects_unknown() {
        assert_eq!(
            Command::lookup("XYZ"),
            Err(UnknownCommand("XYZ".to_string()))
        );
        // exact match only
        assert!(Command::lookup("mva").is_err());
        assert!(Command::lookup("MVAX").is_err());
        assert!(Command::lookup("").is_err());
    }

    #[test]
    fn test_to_command() {
        assert_eq!(Command::Hom.to_command(), Ok(Command::Hom));
        assert_eq!("HOM".to_command(), Ok(Command::Hom));
        assert_eq!(String::from("STP").to_command(), Ok(Command::Stp));
        assert!("NOP".to_command().is_err());
    }
}
