use std::fmt;

/// Every backend route the client talks to.
///
/// Paths are relative to the configured base URL and keep the trailing
/// slash the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Currencies,
    Login,
    VerifyOtp,
    Profile,
    Deposit,
    Withdraw,
    Transfer,
    ConvertPreview,
    MpesaStk,
    MpesaWithdraw,
    WalletCurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Register => "register/",
            Endpoint::Currencies => "currencies/",
            Endpoint::Login => "login/",
            Endpoint::VerifyOtp => "verify-otp/",
            Endpoint::Profile => "user/profile/",
            Endpoint::Deposit => "deposit/",
            Endpoint::Withdraw => "withdraw/",
            Endpoint::Transfer => "transfer/",
            Endpoint::ConvertPreview => "convert-preview/",
            Endpoint::MpesaStk => "mpesa/stk/",
            Endpoint::MpesaWithdraw => "mpesa/withdraw/",
            Endpoint::WalletCurrency => "wallet/",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::Currencies | Endpoint::Profile => Method::Get,
            Endpoint::WalletCurrency => Method::Put,
            _ => Method::Post,
        }
    }

    /// Bearer-protected routes. Calling one without a credential fails fast.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Endpoint::Register | Endpoint::Currencies | Endpoint::Login | Endpoint::VerifyOtp
        )
    }

    /// Routes that move money or change wallet state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Endpoint::Deposit
                | Endpoint::Withdraw
                | Endpoint::Transfer
                | Endpoint::MpesaStk
                | Endpoint::MpesaWithdraw
                | Endpoint::WalletCurrency
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_table() {
        for public in [
            Endpoint::Register,
            Endpoint::Currencies,
            Endpoint::Login,
            Endpoint::VerifyOtp,
        ] {
            assert!(!public.requires_auth(), "{}", public);
        }
        for private in [
            Endpoint::Profile,
            Endpoint::Deposit,
            Endpoint::Withdraw,
            Endpoint::Transfer,
            Endpoint::ConvertPreview,
            Endpoint::MpesaStk,
            Endpoint::MpesaWithdraw,
            Endpoint::WalletCurrency,
        ] {
            assert!(private.requires_auth(), "{}", private);
        }
    }

    #[test]
    fn test_preview_is_not_mutating() {
        assert!(!Endpoint::ConvertPreview.is_mutating());
        assert!(!Endpoint::Profile.is_mutating());
        assert!(Endpoint::Transfer.is_mutating());
    }

    #[test]
    fn test_methods() {
        assert_eq!(Endpoint::Profile.method(), Method::Get);
        assert_eq!(Endpoint::WalletCurrency.method(), Method::Put);
        assert_eq!(Endpoint::MpesaStk.method(), Method::Post);
        assert_eq!(Endpoint::MpesaStk.path(), "mpesa/stk/");
    }
}
