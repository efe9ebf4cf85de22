pub(crate) static APP_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    ", revision ",
    env!("GIT_HASH")
);

/// Value of the `cv` ("client version") header.
pub(crate) static VERSION_STRING: &str =
    concat!(env!("CARGO_PKG_VERSION"), ", revision ", env!("GIT_HASH"));

/// Value of the `cp` ("client platform") header. `5` is the service's code
/// for a non-browser/CLI client.
pub(crate) static CLIENT_PLATFORM: &str = "5";

pub(crate) static DEFAULT_API_URL: &str = "https://app.tuta.com";

/// Sentinels for a full-range `load_range` query (twelve characters each).
pub(crate) static GENERATED_MIN_ID: &str = "------------";
pub(crate) static GENERATED_MAX_ID: &str = "zzzzzzzzzzzz";

/// Soft cap on `MailSet` enumeration (spec §4.J step 3, §9 open question).
pub(crate) static MAIL_SET_PAGE_SIZE: usize = 1000;

/// Number of most-recent `MailSetEntry` rows fetched per folder listing.
pub(crate) static MAIL_LIST_PAGE_SIZE: usize = 10;

/// Ceiling on simultaneous in-flight requests in the mailbox reader's
/// fan-out (spec §5).
pub(crate) static MAX_CONCURRENT_REQUESTS: usize = 5;

/// Model version header for the `sys` app services not tied to a tabulated
/// entity type (the system-keys probe used by the auth orchestrator).
pub(crate) static SYS_SERVICE_VERSION: &str = "143";
