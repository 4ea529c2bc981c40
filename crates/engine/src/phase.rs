use std::fmt;

/// The ordered steps of a conformance run. A run stops at the first phase that fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Top page and market info without a session.
    AnonymousAccess,
    /// Signin and signup must be refused before the bank knows the user.
    NegativeAuth,
    /// Open bank accounts for both users.
    LedgerProvisioning,
    Onboarding,
    /// A second signup with a taken bank id must conflict.
    DuplicateSignup,
    /// A buy the bank cannot cover must be rejected and leave no order behind.
    InsufficientFunds,
    SellCancelRoundTrip,
    TradingTracks,
    /// Reserved for checks after trading; currently a no-op.
    PostFlight,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::AnonymousAccess,
        Phase::NegativeAuth,
        Phase::LedgerProvisioning,
        Phase::Onboarding,
        Phase::DuplicateSignup,
        Phase::InsufficientFunds,
        Phase::SellCancelRoundTrip,
        Phase::TradingTracks,
        Phase::PostFlight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::AnonymousAccess => "anonymous access",
            Phase::NegativeAuth => "negative auth",
            Phase::LedgerProvisioning => "ledger provisioning",
            Phase::Onboarding => "onboarding",
            Phase::DuplicateSignup => "duplicate signup",
            Phase::InsufficientFunds => "insufficient funds",
            Phase::SellCancelRoundTrip => "sell/cancel round trip",
            Phase::TradingTracks => "trading tracks",
            Phase::PostFlight => "post-flight",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
