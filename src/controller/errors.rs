// Controller error codes
//
// When a command fails the controller answers with `<code> <text>` instead of
// data. Codes are sparse; gaps are simply unassigned.

use std::fmt;

macro_rules! error_codes {
    ($($variant:ident = $code:literal, $name:literal, $description:literal;)*) => {
        /// Error reported by the controller in place of a normal reply
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum ErrorCode {
            $($variant = $code,)*
        }

        impl ErrorCode {
            /// Every known code, ascending
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$variant,)*];

            /// Map a numeric code onto the catalog; `None` means "not an error code"
            pub fn from_code(code: i64) -> Option<ErrorCode> {
                match code {
                    $($code => Some(ErrorCode::$variant),)*
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $name,)*
                }
            }

            pub const fn description(self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $description,)*
                }
            }
        }
    };
}

#[rustfmt::skip]
error_codes!(
    ReceiveBufferOverrun = 10, "RECEIVE_BUFFER_OVERRUN", "Receive Buffer Overrun: The Receive Buffer has reached or exceeded maximum capacity.";
    MotorDisabled = 11, "MOTOR_DISABLED", "Motor Disabled: The command that triggered this error was trying to move the servo while it was disabled.";
    NoEncoderDetected = 12, "NO_ENCODER_DETECTED", "No Encoder Detected: The command that triggered this error was trying to access encoder data when no encoder was attached.";
    IndexNotFound = 13, "INDEX_NOT_FOUND", "Index Not Found: The controller moved across the full range of motion and did not find an index.";
    HomeRequiresEncoder = 14, "HOME_REQUIRES_ENCODER", "Home Requires Encoder: The HOM command requires an encoder signal.";
    MoveLimitRequiresEncoder = 15, "MOVE_LIMIT_REQUIRES_ENCODER", "Move Limit Requires Encoder: The MLN and MLP commands require an encoder signal.";
    CommandIsReadOnly = 20, "COMMAND_IS_READ_ONLY", "Command is Read Only: The command that triggered this error only supports read operations. The command must be followed by a question mark to be accepted. Ex: XXX?";
    OneReadOperationPerLine = 21, "ONE_READ_OPERATION_PER_LINE", "One Read Operation Per Line: Multiple read operations on the same command line. Only one read operation is allowed per line, even if addressed to separate axes.";
    TooManyCommandsOnLine = 22, "TOO_MANY_COMMANDS_ON_LINE", "Too Many Commands On Line: The maximum number of allowed commands per command line has been exceeded. No more than 8 commands are allowed on a single command line.";
    LineCharacterLimitExceeded = 23, "LINE_CHARACTER_LIMIT_EXCEEDED", "Line Character Limit Exceeded: The maximum number of characters per command line has been exceeded. Each line has an 80 character limit.";
    MissingAxisNumber = 24, "MISSING_AXIS_NUMBER", "Missing Axis Number: The controller could not find an axis number or the beginning of an instruction. Check the beginning of the command for erroneous characters.";
    MalformedCommand = 25, "MALFORMED_COMMAND", "Malformed Command: The controller could not find a 3-letter instruction in the input. Check to ensure that each instruction in the line has exactly 3 letters referring to a command.";
    InvalidCommand = 26, "INVALID_COMMAND", "Invalid Command: The 3-letter instruction entered is not a valid command. Ensure that the 3-letter instruction is a recognizable command.";
    GlobalReadOperationRequest = 27, "GLOBAL_READ_OPERATION_REQUEST", "Global Read Operation Request: A read request for a command was entered without an axis number. A read request cannot be used in a global context.";
    InvalidParameterType = 28, "INVALID_PARAMETER_TYPE", "Invalid Parameter Type: The parameter entered does not correspond to the type of number that the instruction requires or the allowable precision for a parameter has been exceeded.";
    InvalidCharacterInParameter = 29, "INVALID_CHARACTER_IN_PARAMETER", "Invalid Character in Parameter: There is an alpha character in a parameter that should be a numeric character.";
    CommandCannotBeUsedInGlobalContext = 30, "COMMAND_CANNOT_BE_USED_IN_GLOBAL_CONTEXT", "Command Cannot Be Used In Global Context: The command entered must be addressed to a specific axis number. Not all commands can be used in a global context.";
    ParameterOutOfBounds = 31, "PARAMETER_OUT_OF_BOUNDS", "Parameter Out Of Bounds: The parameter is out of bounds. The current state of the controller will not allow this parameter to be used.";
    IncorrectJogVelocityRequest = 32, "INCORRECT_JOG_VELOCITY_REQUEST", "Incorrect Jog Velocity Request: The jog velocity can only be changed during motion by using a new JOG command. If the VEL command is used to change the velocity, this error will be triggered.";
    NotInJogMode = 33, "NOT_IN_JOG_MODE", "Not In Jog Mode: Sending a JOG command during motion initiated by a move command will trigger this error. To initiate Jog Mode, the controller should be at stand-still.";
    TraceAlreadyInProgress = 34, "TRACE_ALREADY_IN_PROGRESS", "Trace Already In Progress: This error is triggered when a new trace command is received after a trace is already in progress.";
    TraceDidNotComplete = 35, "TRACE_DID_NOT_COMPLETE", "Trace Did Not Complete: An error occurred while recording trace data. Try the operation again.";
    CommandCannotBeExecutedDuringMotion = 36, "COMMAND_CANNOT_BE_EXECUTED_DURING_MOTION", "Command Cannot Be Executed During Motion: Only certain commands can be executed when motion is in progress.";
    MoveOutsideSoftLimits = 37, "MOVE_OUTSIDE_SOFT_LIMITS", "Move Outside Soft Limits: If a requested move will take the controller outside of the preset travel limits, then the command will not be executed.";
    ReadNotAvailableForThisCommand = 38, "READ_NOT_AVAILABLE_FOR_THIS_COMMAND", "Read Not Available For This Command: This error is triggered by a read request from a command that does not support a read operation.";
    ProgramNumberOutOfRange = 39, "PROGRAM_NUMBER_OUT_OF_RANGE", "Program Number Out of Range: The number entered for the program number was either less than 1 or greater than 16.";
    ProgramSizeLimitExceeded = 40, "PROGRAM_SIZE_LIMIT_EXCEEDED", "Program Size Limit Exceeded: The program has exceeded the character limit of 4 Kb.";
    ProgramFailedToRecord = 41, "PROGRAM_FAILED_TO_RECORD", "Program failed to Record: Error in recording program. Erase program and try operation again.";
    EndCommandMustBeOnItsOwnLine = 42, "END_COMMAND_MUST_BE_ON_ITS_OWN_LINE", "End Command Must Be on its Own Line: The End command used to end a program must be on a separate line from all other instructions.";
    FailedToReadProgram = 43, "FAILED_TO_READ_PROGRAM", "Failed to Read Program: An error occurred while trying to read a program. Try the Operation again.";
    CommandOnlyValidWithinProgram = 44, "COMMAND_ONLY_VALID_WITHIN_PROGRAM", "Command Only Valid Within Program: The command that triggered this error is only suitable for use within a program.";
    ProgramAlreadyExists = 45, "PROGRAM_ALREADY_EXISTS", "Program Already Exists: A program already exists for the indicated program parameter. The program must be erased with the ERA command before being written again.";
    ProgramDoesNotExist = 46, "PROGRAM_DOES_NOT_EXIST", "Program Doesn't Exist: The indicated program does not exist. This error can occur when you try to execute a program number that has not had a program assigned to it.";
    ReadOperationsNotAllowedInsideProgram = 47, "READ_OPERATIONS_NOT_ALLOWED_INSIDE_PROGRAM", "Read Operations Not Allowed Inside Program: Read Operations are not permitted in programs.";
    CommandNotAllowedWhileProgramInProgress = 48, "COMMAND_NOT_ALLOWED_WHILE_PROGRAM_IN_PROGRESS", "Command Not Allowed While Program in Progress: The command that triggered this error was given while a program was executing.";
    LimitActivated = 50, "LIMIT_ACTIVATED", "Limit Activated: Motion in the direction of the activated limit switch is disallowed if limit switches are enabled.";
    EndOfTravelLimit = 51, "END_OF_TRAVEL_LIMIT", "End of Travel Limit: The requested move will take the controller outside of its valid travel range, therefore the move is disallowed.";
    HomeInProgress = 52, "HOME_IN_PROGRESS", "Home In Progress: A Home or a Move To Limit Procedure is in progress. Motion commands are disallowed during this time.";
    IoFunctionAlreadyInUse = 53, "IO_FUNCTION_ALREADY_IN_USE", "IO Function Already In Use: The I/O Function in question is already assigned to another I/O pin.";
    LimitsAreNotConfiguredProperly = 55, "LIMITS_ARE_NOT_CONFIGURED_PROPERLY", "Limits Are Not Configured Properly: Both Limit Switches are active, so motion is disallowed in both directions. Most likely the LPL (Limit Polarity command) setting should be switched.";
    CommandNotAvailableInThisVersion = 80, "COMMAND_NOT_AVAILABLE_IN_THIS_VERSION", "Command Not Available in this Version: The command entered is not supported in this version of the firmware.";
    AnalogEncoderNotAvailableInThisVersion = 81, "ANALOG_ENCODER_NOT_AVAILABLE_IN_THIS_VERSION", "Analog Encoder Not Available In this Version: The current version of firmware installed does not support analog encoders.";
);

impl ErrorCode {
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// `NAME: description`, the form surfaced to operators
    pub fn message(self) -> String {
        format!("{}: {}", self.name(), self.description())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.description())
    }
}

/// How a raw reply should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// The reply is an error report for the preceding command
    Error(ErrorCode),
    /// Anything else, including numeric replies that are not a known code
    Data(&'a str),
}

/// Decide whether a reply is an error report.
///
/// Only the leading whitespace-delimited token is inspected: a catalogued
/// integer there makes the whole reply an error. Non-numeric tokens, unknown
/// numbers (positions, counts) and empty replies are data.
pub fn classify(response: &str) -> Classification<'_> {
    let code = response
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .and_then(ErrorCode::from_code);

    match code {
        Some(code) => Classification::Error(code),
        None => Classification::Data(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_codes_positive_and_unique() {
        let codes: HashSet<u16> = ErrorCode::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), ErrorCode::ALL.len());
        assert!(codes.iter().all(|&c| c > 0));
    }

    #[test]
    fn test_from_code_roundtrips_catalog() {
        for &code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code() as i64), Some(code));
        }
    }

    #[test]
    fn test_gaps_are_not_error_codes() {
        assert_eq!(ErrorCode::from_code(0), None);
        assert_eq!(ErrorCode::from_code(16), None);
        assert_eq!(ErrorCode::from_code(49), None);
        assert_eq!(ErrorCode::from_code(54), None);
        assert_eq!(ErrorCode::from_code(-10), None);
    }

    #[test]
    fn test_message_format() {
        let code = ErrorCode::ReceiveBufferOverrun;
        assert_eq!(code.code(), 10);
        assert!(code.message().starts_with("RECEIVE_BUFFER_OVERRUN:"));
        assert_eq!(code.to_string(), code.message());
    }

    #[test]
    fn test_classify_error_reply() {
        assert_eq!(
            classify("10 Receive Buffer Overrun"),
            Classification::Error(ErrorCode::ReceiveBufferOverrun)
        );
        assert_eq!(
            classify("  37 Move Outside Soft Limits"),
            Classification::Error(ErrorCode::MoveOutsideSoftLimits)
        );
        assert_eq!(classify("81"), Classification::Error(ErrorCode::AnalogEncoderNotAvailableInThisVersion));
    }

    #[test]
    fn test_classify_data_reply() {
        // non-numeric leading token
        assert_eq!(classify("#1.000,1.000"), Classification::Data("#1.000,1.000"));
        // numeric, but not a catalogued code
        assert_eq!(classify("123.45"), Classification::Data("123.45"));
        assert_eq!(classify("99 bottles"), Classification::Data("99 bottles"));
        assert_eq!(classify("0"), Classification::Data("0"));
        // nothing at all
        assert_eq!(classify(""), Classification::Data(""));
        assert_eq!(classify("   "), Classification::Data("   "));
    }

    #[test]
    fn test_classify_only_looks_at_first_token() {
        // garbled text after a non-numeric token is still data
        assert_eq!(
            classify("abc 10 def"),
            Classification::Data("abc 10 def")
        );
    }
}
