//! Operation names, arities and the invocation response envelope.

use crate::error::{TokenError, TokenResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_ERROR: u16 = 500;

/// Every operation reachable through `invoke`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TotalSupply,
    BalanceOf,
    Allowance,
    Transfer,
    Approve,
    ApprovalList,
    TransferFrom,
    IncreaseAllowance,
    DecreaseAllowance,
    TransferOtherToken,
    Mint,
    Burn,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::TotalSupply,
        Operation::BalanceOf,
        Operation::Allowance,
        Operation::Transfer,
        Operation::Approve,
        Operation::ApprovalList,
        Operation::TransferFrom,
        Operation::IncreaseAllowance,
        Operation::DecreaseAllowance,
        Operation::TransferOtherToken,
        Operation::Mint,
        Operation::Burn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::TotalSupply => "totalSupply",
            Operation::BalanceOf => "balanceOf",
            Operation::Allowance => "allowance",
            Operation::Transfer => "transfer",
            Operation::Approve => "approve",
            Operation::ApprovalList => "approvalList",
            Operation::TransferFrom => "transferFrom",
            Operation::IncreaseAllowance => "increaseAllowance",
            Operation::DecreaseAllowance => "decreaseAllowance",
            Operation::TransferOtherToken => "transferOtherToken",
            Operation::Mint => "mint",
            Operation::Burn => "burn",
        }
    }

    /// Required parameter count; `None` for the reserved operations, which
    /// accept anything.
    pub fn arity(self) -> Option<usize> {
        match self {
            Operation::TotalSupply | Operation::BalanceOf | Operation::ApprovalList => Some(1),
            Operation::Allowance => Some(2),
            Operation::Transfer
            | Operation::Approve
            | Operation::IncreaseAllowance
            | Operation::DecreaseAllowance => Some(3),
            Operation::TransferFrom | Operation::TransferOtherToken => Some(4),
            Operation::Mint | Operation::Burn => None,
        }
    }

    /// Whether the operation may write state.
    pub fn is_mutating(self) -> bool {
        !matches!(
            self,
            Operation::TotalSupply
                | Operation::BalanceOf
                | Operation::Allowance
                | Operation::ApprovalList
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| TokenError::UnknownOperation(s.to_string()))
    }
}

/// A decoded invocation: the operation plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    TotalSupply { token_name: String },
    BalanceOf { address: String },
    Allowance { owner: String, spender: String },
    Transfer { from: String, to: String, amount: String },
    Approve { owner: String, spender: String, amount: String },
    ApprovalList { owner: String },
    TransferFrom {
        owner: String,
        spender: String,
        recipient: String,
        amount: String,
    },
    IncreaseAllowance { owner: String, spender: String, delta: String },
    DecreaseAllowance { owner: String, spender: String, delta: String },
    /// Move `amount` of the token kept by the ledger named `ledger`.
    TransferOtherToken {
        ledger: String,
        caller: String,
        recipient: String,
        amount: String,
    },
    Mint(Vec<String>),
    Burn(Vec<String>),
}

impl Call {
    /// Resolve `function` and bind `params` to it. Unknown names and arity
    /// mismatches fail here, before the ledger touches any state.
    pub fn parse<S: AsRef<str>>(function: &str, params: &[S]) -> TokenResult<Call> {
        let operation: Operation = function.parse()?;
        let params: Vec<String> = params.iter().map(|p| p.as_ref().to_string()).collect();

        let call = match (operation, params.as_slice()) {
            (Operation::TotalSupply, [token_name]) => Call::TotalSupply {
                token_name: token_name.clone(),
            },
            (Operation::BalanceOf, [address]) => Call::BalanceOf {
                address: address.clone(),
            },
            (Operation::Allowance, [owner, spender]) => Call::Allowance {
                owner: owner.clone(),
                spender: spender.clone(),
            },
            (Operation::Transfer, [from, to, amount]) => Call::Transfer {
                from: from.clone(),
                to: to.clone(),
                amount: amount.clone(),
            },
            (Operation::Approve, [owner, spender, amount]) => Call::Approve {
                owner: owner.clone(),
                spender: spender.clone(),
                amount: amount.clone(),
            },
            (Operation::ApprovalList, [owner]) => Call::ApprovalList {
                owner: owner.clone(),
            },
            (Operation::TransferFrom, [owner, spender, recipient, amount]) => Call::TransferFrom {
                owner: owner.clone(),
                spender: spender.clone(),
                recipient: recipient.clone(),
                amount: amount.clone(),
            },
            (Operation::IncreaseAllowance, [owner, spender, delta]) => Call::IncreaseAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                delta: delta.clone(),
            },
            (Operation::DecreaseAllowance, [owner, spender, delta]) => Call::DecreaseAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                delta: delta.clone(),
            },
            (Operation::TransferOtherToken, [ledger, caller, recipient, amount]) => {
                Call::TransferOtherToken {
                    ledger: ledger.clone(),
                    caller: caller.clone(),
                    recipient: recipient.clone(),
                    amount: amount.clone(),
                }
            }
            (Operation::Mint, _) => Call::Mint(params.clone()),
            (Operation::Burn, _) => Call::Burn(params.clone()),
            (operation, params) => {
                return Err(TokenError::Arity {
                    operation: operation.name(),
                    expected: operation.arity().unwrap_or_default(),
                    got: params.len(),
                })
            }
        };
        Ok(call)
    }

    pub fn operation(&self) -> Operation {
        match self {
            Call::TotalSupply { .. } => Operation::TotalSupply,
            Call::BalanceOf { .. } => Operation::BalanceOf,
            Call::Allowance { .. } => Operation::Allowance,
            Call::Transfer { .. } => Operation::Transfer,
            Call::Approve { .. } => Operation::Approve,
            Call::ApprovalList { .. } => Operation::ApprovalList,
            Call::TransferFrom { .. } => Operation::TransferFrom,
            Call::IncreaseAllowance { .. } => Operation::IncreaseAllowance,
            Call::DecreaseAllowance { .. } => Operation::DecreaseAllowance,
            Call::TransferOtherToken { .. } => Operation::TransferOtherToken,
            Call::Mint(_) => Operation::Mint,
            Call::Burn(_) => Operation::Burn,
        }
    }
}

/// Parameters of the initialization entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
    pub token_name: String,
    pub symbol: String,
    pub owner: String,
    pub total_supply: String,
}

impl InitArgs {
    pub fn parse<S: AsRef<str>>(params: &[S]) -> TokenResult<InitArgs> {
        match params {
            [token_name, symbol, owner, total_supply] => Ok(InitArgs {
                token_name: token_name.as_ref().to_string(),
                symbol: symbol.as_ref().to_string(),
                owner: owner.as_ref().to_string(),
                total_supply: total_supply.as_ref().to_string(),
            }),
            _ => Err(TokenError::Arity {
                operation: "init",
                expected: 4,
                got: params.len(),
            }),
        }
    }
}

/// What an invocation hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            payload,
        }
    }

    pub fn error(err: &TokenError) -> Self {
        let message = match err {
            TokenError::UnknownOperation(_) => "404 Not Found".to_string(),
            other => other.to_string(),
        };
        Self {
            status: err.status(),
            message,
            payload: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Payload as text; all payloads produced by the ledger are UTF-8.
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operation_is_not_found() {
        let err = Call::parse("steal", &["a"]).unwrap_err();
        assert!(matches!(err, TokenError::UnknownOperation(ref name) if name == "steal"));
        let response = Response::error(&err);
        assert_eq!(response.status, STATUS_NOT_FOUND);
        assert_eq!(response.message, "404 Not Found");
    }

    #[test]
    fn test_operation_names_are_case_sensitive() {
        assert!("Transfer".parse::<Operation>().is_err());
        assert!("init".parse::<Operation>().is_err());
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Call::parse("transfer", &["a", "b"]).unwrap_err();
        match err {
            TokenError::Arity {
                operation,
                expected,
                got,
            } => {
                assert_eq!(operation, "transfer");
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("Expected Arity error, got {other:?}"),
        }
        assert!(Call::parse("transferFrom", &["a", "b", "c", "1", "x"]).is_err());
    }

    #[test]
    fn test_parse_binds_positional_params() {
        let call = Call::parse("transferFrom", &["owner", "spender", "bob", "7"]).unwrap();
        assert_eq!(
            call,
            Call::TransferFrom {
                owner: "owner".to_string(),
                spender: "spender".to_string(),
                recipient: "bob".to_string(),
                amount: "7".to_string(),
            }
        );
        assert_eq!(call.operation(), Operation::TransferFrom);
    }

    #[test]
    fn test_reserved_operations_accept_any_arity() {
        let empty: [&str; 0] = [];
        assert_eq!(Call::parse("mint", &empty).unwrap(), Call::Mint(vec![]));
        assert!(Call::parse("burn", &["a", "b", "c"]).is_ok());
    }

    #[test]
    fn test_init_args_arity() {
        assert!(InitArgs::parse(&["dappToken", "dt", "owner", "100"]).is_ok());
        assert!(matches!(
            InitArgs::parse(&["dappToken", "dt", "owner"]),
            Err(TokenError::Arity { operation: "init", expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_mutating_flags() {
        assert!(!Operation::BalanceOf.is_mutating());
        assert!(!Operation::ApprovalList.is_mutating());
        assert!(Operation::TransferFrom.is_mutating());
        assert!(Operation::TransferOtherToken.is_mutating());
    }

    #[test]
    fn test_transfer_other_token_arity() {
        let call = Call::parse("transferOtherToken", &["otherToken", "alice", "bob", "5"]).unwrap();
        assert_eq!(call.operation(), Operation::TransferOtherToken);
        assert!(matches!(
            Call::parse("transferOtherToken", &["otherToken", "alice", "bob"]),
            Err(TokenError::Arity {
                operation: "transferOtherToken",
                expected: 4,
                got: 3
            })
        ));
    }
}
