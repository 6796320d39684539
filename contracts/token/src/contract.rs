use crate::allowance::{list_allowances, read_allowance, write_allowance};
use crate::amount::{parse_non_negative, parse_positive, Amount};
use crate::balance::{read_balance, write_balance};
use crate::error::{TokenError, TokenResult};
use crate::event::{emit, Approval, EncodedEvent, TransferEvent};
use crate::host::Host;
use crate::metadata::{read_total_supply, write_metadata, TokenMetadata};
use crate::operation::{Call, InitArgs, Operation, Response};
use crate::storage_types::{validate_identifier, KeyLayout};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the reserved `mint` and `burn` operations answer.
///
/// Neither carries issuance logic; the ledger has a fixed supply set at
/// initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservedOps {
    /// Succeed without touching state.
    #[default]
    NoOp,
    /// Fail with [`TokenError::Reserved`].
    Reject,
}

impl FromStr for ReservedOps {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noop" | "no-op" => Ok(Self::NoOp),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown reserved-ops policy {other:?}")),
        }
    }
}

pub trait TokenTrait<H: Host + ?Sized> {
    fn initialize(&self, e: &mut H, args: &InitArgs) -> TokenResult<TokenMetadata>;
    fn total_supply(&self, e: &H, token_name: &str) -> TokenResult<u64>;
    fn balance_of(&self, e: &H, address: &str) -> TokenResult<Amount>;
    fn allowance(&self, e: &H, owner: &str, spender: &str) -> TokenResult<Amount>;
    fn transfer(&self, e: &mut H, from: &str, to: &str, amount: &str) -> TokenResult<TransferEvent>;
    fn approve(&self, e: &mut H, owner: &str, spender: &str, amount: &str) -> TokenResult<Approval>;
    fn approval_list(&self, e: &H, owner: &str) -> TokenResult<Vec<Approval>>;
    fn transfer_from(
        &self,
        e: &mut H,
        owner: &str,
        spender: &str,
        recipient: &str,
        amount: &str,
    ) -> TokenResult<(TransferEvent, Approval)>;
    fn increase_allowance(&self, e: &mut H, owner: &str, spender: &str, delta: &str) -> TokenResult<Approval>;
    fn decrease_allowance(&self, e: &mut H, owner: &str, spender: &str, delta: &str) -> TokenResult<Approval>;
    fn transfer_other_token(
        &self,
        e: &mut H,
        ledger: &str,
        caller: &str,
        recipient: &str,
        amount: &str,
    ) -> TokenResult<()>;
    fn mint(&self, e: &mut H, params: &[String]) -> TokenResult<()>;
    fn burn(&self, e: &mut H, params: &[String]) -> TokenResult<()>;
}

/// The ledger state machine.
///
/// Holds no state of its own: every operation is a function of the keys it
/// reads through the host plus its parameters. Each operation reads and
/// validates everything first, then writes, so an error never leaves a
/// partial update behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenLedger {
    layout: KeyLayout,
    reserved_ops: ReservedOps,
}

/// Balances to write and the event to emit for one value movement.
struct TransferPlan {
    from_balance: Amount,
    to_balance: Amount,
    event: TransferEvent,
    encoded: EncodedEvent,
}

impl TransferPlan {
    fn apply<H: Host + ?Sized>(self, e: &mut H, layout: KeyLayout) -> TokenResult<TransferEvent> {
        let TransferEvent {
            sender, recipient, ..
        } = &self.event;
        write_balance(e, layout, sender, self.from_balance)?;
        if sender != recipient {
            write_balance(e, layout, recipient, self.to_balance)?;
        }
        emit(e, &self.encoded)?;
        Ok(self.event)
    }
}

struct ApprovalPlan {
    event: Approval,
    encoded: EncodedEvent,
}

impl ApprovalPlan {
    fn apply<H: Host + ?Sized>(self, e: &mut H) -> TokenResult<Approval> {
        write_allowance(e, &self.event.owner, &self.event.spender, self.event.allowance)?;
        emit(e, &self.encoded)?;
        Ok(self.event)
    }
}

const TRANSFER_OK: &[u8] = b"transfer success";
const APPROVE_OK: &[u8] = b"approve success";
const TRANSFER_FROM_OK: &[u8] = b"transferFrom success";
const INCREASE_OK: &[u8] = b"increaseAllowance success";
const DECREASE_OK: &[u8] = b"decreaseAllowance success";
const TRANSFER_OTHER_OK: &[u8] = b"transfer other token success";

impl TokenLedger {
    pub fn new(layout: KeyLayout, reserved_ops: ReservedOps) -> Self {
        Self {
            layout,
            reserved_ops,
        }
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    pub fn reserved_ops(&self) -> ReservedOps {
        self.reserved_ops
    }

    /// Initialization entry point: binds the raw parameters, then writes
    /// metadata and the owner's opening balance.
    pub fn init<H: Host + ?Sized, S: AsRef<str>>(&self, e: &mut H, params: &[S]) -> Response {
        let result = InitArgs::parse(params).and_then(|args| self.initialize(e, &args));
        match result {
            Ok(_) => Response::success(Vec::new()),
            Err(err) => {
                tracing::warn!("init rejected: {}", err);
                Response::error(&err)
            }
        }
    }

    /// Invocation entry point: resolves `function`, runs it and wraps the
    /// outcome for the host.
    pub fn invoke<H: Host + ?Sized, S: AsRef<str>>(
        &self,
        e: &mut H,
        function: &str,
        params: &[S],
    ) -> Response {
        let result = Call::parse(function, params).and_then(|call| self.execute(e, call));
        match result {
            Ok(payload) => Response::success(payload),
            Err(err) => {
                tracing::warn!(function, "invocation rejected: {}", err);
                Response::error(&err)
            }
        }
    }

    /// Run a decoded call and produce its success payload.
    pub fn execute<H: Host + ?Sized>(&self, e: &mut H, call: Call) -> TokenResult<Vec<u8>> {
        match call {
            Call::TotalSupply { token_name } => {
                Ok(self.total_supply(&*e, &token_name)?.to_string().into_bytes())
            }
            Call::BalanceOf { address } => Ok(self.balance_of(&*e, &address)?.to_string().into_bytes()),
            Call::Allowance { owner, spender } => {
                Ok(self.allowance(&*e, &owner, &spender)?.to_string().into_bytes())
            }
            Call::Transfer { from, to, amount } => {
                self.transfer(e, &from, &to, &amount)?;
                Ok(TRANSFER_OK.to_vec())
            }
            Call::Approve {
                owner,
                spender,
                amount,
            } => {
                self.approve(e, &owner, &spender, &amount)?;
                Ok(APPROVE_OK.to_vec())
            }
            Call::ApprovalList { owner } => {
                let approvals = self.approval_list(&*e, &owner)?;
                serde_json::to_vec(&approvals).map_err(|source| TokenError::Encoding {
                    what: "approval list",
                    source,
                })
            }
            Call::TransferFrom {
                owner,
                spender,
                recipient,
                amount,
            } => {
                self.transfer_from(e, &owner, &spender, &recipient, &amount)?;
                Ok(TRANSFER_FROM_OK.to_vec())
            }
            Call::IncreaseAllowance {
                owner,
                spender,
                delta,
            } => {
                self.increase_allowance(e, &owner, &spender, &delta)?;
                Ok(INCREASE_OK.to_vec())
            }
            Call::DecreaseAllowance {
                owner,
                spender,
                delta,
            } => {
                self.decrease_allowance(e, &owner, &spender, &delta)?;
                Ok(DECREASE_OK.to_vec())
            }
            Call::TransferOtherToken {
                ledger,
                caller,
                recipient,
                amount,
            } => {
                self.transfer_other_token(e, &ledger, &caller, &recipient, &amount)?;
                Ok(TRANSFER_OTHER_OK.to_vec())
            }
            Call::Mint(params) => {
                self.mint(e, &params)?;
                Ok(Vec::new())
            }
            Call::Burn(params) => {
                self.burn(e, &params)?;
                Ok(Vec::new())
            }
        }
    }

    fn plan_transfer<H: Host + ?Sized>(
        &self,
        e: &H,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> TokenResult<TransferPlan> {
        validate_identifier("sender", from)?;
        validate_identifier("recipient", to)?;

        let from_balance = read_balance(e, self.layout, from, false)?;
        let to_balance = if from == to {
            from_balance
        } else {
            read_balance(e, self.layout, to, true)?
        };

        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                address: from.to_string(),
                balance: from_balance,
                amount,
            });
        }

        let (from_balance, to_balance) = if from == to {
            (from_balance, to_balance)
        } else {
            let credited = to_balance.checked_add(amount).ok_or_else(|| TokenError::Overflow {
                field: format!("balance of {to}"),
            })?;
            (from_balance - amount, credited)
        };

        let event = TransferEvent {
            sender: from.to_string(),
            recipient: to.to_string(),
            amount,
        };
        let encoded = event.encode()?;
        Ok(TransferPlan {
            from_balance,
            to_balance,
            event,
            encoded,
        })
    }

    fn plan_approval(&self, owner: &str, spender: &str, allowance: Amount) -> TokenResult<ApprovalPlan> {
        validate_identifier("owner", owner)?;
        validate_identifier("spender", spender)?;
        let event = Approval {
            owner: owner.to_string(),
            spender: spender.to_string(),
            allowance,
        };
        let encoded = event.encode()?;
        Ok(ApprovalPlan { event, encoded })
    }
}

impl<H: Host + ?Sized> TokenTrait<H> for TokenLedger {
    fn initialize(&self, e: &mut H, args: &InitArgs) -> TokenResult<TokenMetadata> {
        let metadata = TokenMetadata::new(&args.token_name, &args.symbol, &args.owner, &args.total_supply)?;
        validate_identifier("tokenName", &metadata.name)?;
        validate_identifier("owner", &metadata.owner)?;
        if self.layout == KeyLayout::Legacy && metadata.name == metadata.owner {
            return Err(TokenError::Validation {
                field: "owner",
                reason: "cannot equal the token name under the legacy key layout".to_string(),
            });
        }
        let opening_balance = Amount::try_from(metadata.total_supply).map_err(|_| TokenError::Overflow {
            field: "totalSupply".to_string(),
        })?;

        write_metadata(e, self.layout, &metadata)?;
        write_balance(e, self.layout, &metadata.owner, opening_balance)?;

        tracing::info!(
            token = %metadata.name,
            symbol = %metadata.symbol,
            owner = %metadata.owner,
            supply = metadata.total_supply,
            "token initialized"
        );
        Ok(metadata)
    }

    fn total_supply(&self, e: &H, token_name: &str) -> TokenResult<u64> {
        let supply = read_total_supply(e, self.layout, token_name)?;
        tracing::debug!(token = token_name, supply, "total supply read");
        Ok(supply)
    }

    fn balance_of(&self, e: &H, address: &str) -> TokenResult<Amount> {
        validate_identifier("address", address)?;
        read_balance(e, self.layout, address, true)
    }

    fn allowance(&self, e: &H, owner: &str, spender: &str) -> TokenResult<Amount> {
        validate_identifier("owner", owner)?;
        validate_identifier("spender", spender)?;
        read_allowance(e, owner, spender, true)
    }

    fn transfer(&self, e: &mut H, from: &str, to: &str, amount: &str) -> TokenResult<TransferEvent> {
        let amount = parse_positive("transferAmount", amount)?;
        let plan = self.plan_transfer(&*e, from, to, amount)?;
        let event = plan.apply(e, self.layout)?;
        tracing::info!(from, to, amount, "transfer applied");
        Ok(event)
    }

    fn approve(&self, e: &mut H, owner: &str, spender: &str, amount: &str) -> TokenResult<Approval> {
        let amount = parse_non_negative("allowanceAmount", amount)?;
        let event = self.plan_approval(owner, spender, amount)?.apply(e)?;
        tracing::info!(owner, spender, allowance = amount, "allowance set");
        Ok(event)
    }

    fn approval_list(&self, e: &H, owner: &str) -> TokenResult<Vec<Approval>> {
        validate_identifier("owner", owner)?;
        list_allowances(e, owner)?.collect()
    }

    fn transfer_from(
        &self,
        e: &mut H,
        owner: &str,
        spender: &str,
        recipient: &str,
        amount: &str,
    ) -> TokenResult<(TransferEvent, Approval)> {
        let amount = parse_positive("transferAmount", amount)?;
        let allowance = self.allowance(&*e, owner, spender)?;
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: owner.to_string(),
                spender: spender.to_string(),
                allowance,
                amount,
            });
        }

        let transfer = self.plan_transfer(&*e, owner, recipient, amount)?;
        let approval = self.plan_approval(owner, spender, allowance - amount)?;

        let transfer = transfer.apply(e, self.layout)?;
        let approval = approval.apply(e)?;
        tracing::info!(
            owner,
            spender,
            recipient,
            amount,
            remaining = approval.allowance,
            "delegated transfer applied"
        );
        Ok((transfer, approval))
    }

    fn increase_allowance(&self, e: &mut H, owner: &str, spender: &str, delta: &str) -> TokenResult<Approval> {
        let delta = parse_positive("increaseAmount", delta)?;
        let current = self.allowance(&*e, owner, spender)?;
        let next = current.checked_add(delta).ok_or_else(|| TokenError::Overflow {
            field: format!("allowance of {spender} over {owner}"),
        })?;
        let event = self.plan_approval(owner, spender, next)?.apply(e)?;
        tracing::info!(owner, spender, allowance = next, "allowance increased");
        Ok(event)
    }

    fn decrease_allowance(&self, e: &mut H, owner: &str, spender: &str, delta: &str) -> TokenResult<Approval> {
        let delta = parse_positive("decreaseAmount", delta)?;
        let current = self.allowance(&*e, owner, spender)?;
        // Floors at zero; unlike transfer, going under is not an error.
        let next = current.saturating_sub(delta).max(0);
        let event = self.plan_approval(owner, spender, next)?.apply(e)?;
        tracing::info!(owner, spender, allowance = next, "allowance decreased");
        Ok(event)
    }

    /// Forward a transfer to the token kept by another ledger. Nothing is
    /// written locally; the other ledger validates and applies on its own.
    fn transfer_other_token(
        &self,
        e: &mut H,
        ledger: &str,
        caller: &str,
        recipient: &str,
        amount: &str,
    ) -> TokenResult<()> {
        validate_identifier("ledger", ledger)?;
        let response = e.invoke_ledger(ledger, Operation::Transfer.name(), &[caller, recipient, amount])?;
        if !response.is_ok() {
            return Err(TokenError::CrossLedger {
                ledger: ledger.to_string(),
                message: response.message,
            });
        }
        tracing::info!(ledger, caller, recipient, amount, "cross-ledger transfer forwarded");
        Ok(())
    }

    fn mint(&self, _e: &mut H, _params: &[String]) -> TokenResult<()> {
        match self.reserved_ops {
            ReservedOps::NoOp => Ok(()),
            ReservedOps::Reject => Err(TokenError::Reserved("mint")),
        }
    }

    fn burn(&self, _e: &mut H, _params: &[String]) -> TokenResult<()> {
        match self.reserved_ops {
            ReservedOps::NoOp => Ok(()),
            ReservedOps::Reject => Err(TokenError::Reserved("burn")),
        }
    }
}
