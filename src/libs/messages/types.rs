/// Every user-facing message the application prints or sends to a notifier.
///
/// Text lives in `display.rs`; variants carry only the values interpolated
/// into that text.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // === WORK SESSION MESSAGES ===
    ClockedIn(String),  // local time
    SessionAlreadyOpen(String), // clock-in time
    NoOpenSession,
    BreakStarted(String), // local time
    BreakEnded(i64),      // minutes
    BreakAlreadyOpen,
    NotOnBreak,
    ClockedOut {
        net_minutes: i64,
        break_minutes: i64,
    },
    ClockOutBeforeClockIn,
    ConfirmLongSession(f64), // hours
    ConfirmZeroSession,
    ClockOutDeclined,
    SessionRecovered(String), // clock-in time
    SessionWritePending(String), // error
    SessionSavedLocally,
    SessionClockOutDiscarded,
    PendingWritesFlushed(usize),
    PendingWriteFailed(String),
    NoPendingWrites,
    SessionStatusHeader,
    SelectRecoveryAction,
    WatchStopped,
    LiveElapsed {
        work: String,
        breaks: String,
    },

    // === ACTIVE TASK MESSAGES ===
    TaskStarted(String),
    TaskPaused(String),
    TaskResumed(String),
    TaskCompleted(String, i64), // name, minutes
    TaskDeleted(String),
    TaskLimitReached(usize),
    TaskNameEmpty,
    TasksStillRunning(Vec<String>),
    ConfirmDeleteTask(String),
    NoActiveTasks,
    ActiveTasksHeader,
    SelectTask,
    PromptTaskName,

    // === TIME LOG MESSAGES ===
    TimeLogCreated(i64), // minutes
    TimeLogDeleted(String),
    TimeLogInvoiced(String, String), // log id, invoice id
    TimeLogsHeader(String),          // week key
    NoTimeLogs,
    ConfirmDeleteTimeLog(String),

    // === STATS MESSAGES ===
    StatsHeader(String), // week key
    WeekTotal {
        total: String,
        target: String,
    },
    StatsRecomputed(String), // week key
    BackfillProgress {
        done: usize,
        total: usize,
        week: String,
    },
    BackfillCompleted(usize),
    WeeklyHistoryHeader,
    NoWeeklyTotals,

    // === REPORT AND EXPORT MESSAGES ===
    ReportHeader,
    ExportStarted(String), // file name
    ExportCompleted(String),

    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigDeleted,
    ConfigModuleSettings,
    ConfigModuleTracker,
    InvalidTimezone(String),

    // === PROMPTS ===
    PromptTimezone,
    PromptWeekStart,
    PromptWeeklyTarget,
    PromptPersonId,
    PromptDefaultJob,
    PromptMaxSessionHours,
    PromptSelectModules,

    // === GENERAL MESSAGES ===
    OperationCancelled,
    AmbiguousId(String),
    NoMatchingId(String),
}
