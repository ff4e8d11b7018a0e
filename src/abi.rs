use crate::types::{format_hex, printable_text};
use crate::units::Denomination;
use alloy_dyn_abi::{DynSolValue, EventExt, JsonAbiExt};
use alloy_json_abi::{Event, Function, JsonAbi};
use alloy_primitives::{Bytes, LogData, B256};
use anyhow::{anyhow, Context, Result};

const WALLET_ABI: &str = include_str!("../abi/MultiSigWalletWithDailyLimit.json");
const ERC20_ABI: &str = include_str!("../abi/ERC20.json");

alloy_sol_types::sol! {
    function isOwner(address owner) view returns (bool);
    function getOwners() view returns (address[]);
    function required() view returns (uint256);
    function dailyLimit() view returns (uint256);
    function lastDay() view returns (uint256);
    function spentToday() view returns (uint256);
    function calcMaxWithdraw() view returns (uint256);
    function transactionCount() view returns (uint256);
    function transactions(uint256 id) view returns (address destination, uint256 value, bytes data, bool executed);
    function confirmations(uint256 id, address owner) view returns (bool);
    function isConfirmed(uint256 transactionId) view returns (bool);
    function getConfirmationCount(uint256 transactionId) view returns (uint256);
    function getConfirmations(uint256 transactionId) view returns (address[]);
    function MAX_OWNER_COUNT() view returns (uint256);

    function decimals() view returns (uint8);
    function symbol() view returns (string);
    function balanceOf(address account) view returns (uint256);

    event Submission(uint256 indexed transactionId);
}

/// One contract's method and event descriptors.
#[derive(Debug, Clone)]
pub struct MethodSet {
    abi: JsonAbi,
}

#[derive(Debug, Clone)]
pub struct DecodedCall {
    pub function: Function,
    pub args: Vec<(String, DynSolValue)>,
}

#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub name: String,
    pub fields: Vec<(String, DynSolValue)>,
}

impl MethodSet {
    pub fn from_json(json: &str) -> Result<Self> {
        let abi = serde_json::from_str::<JsonAbi>(json).context("failed to parse abi json")?;
        Ok(Self { abi })
    }

    pub fn wallet() -> Result<Self> {
        Self::from_json(WALLET_ABI)
    }

    pub fn erc20() -> Result<Self> {
        Self::from_json(ERC20_ABI)
    }

    pub fn function(&self, name: &str) -> Result<&Function> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| anyhow!("method not found: {name}"))
    }

    /// Selector followed by the packed arguments.
    pub fn encode(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        let function = self.function(name)?;
        let data = function
            .abi_encode_input(args)
            .map_err(|err| anyhow!("failed to encode {}: {err}", function.signature()))?;
        Ok(Bytes::from(data))
    }

    /// `Ok(None)` when the selector is not one of ours; the payload is then
    /// opaque and only fit for display.
    pub fn decode(&self, calldata: &[u8]) -> Result<Option<DecodedCall>> {
        if calldata.len() < 4 {
            return Ok(None);
        }
        let (selector, body) = calldata.split_at(4);
        let Some(function) = self
            .abi
            .functions()
            .find(|function| function.selector().as_slice() == selector)
        else {
            return Ok(None);
        };

        let values = function
            .abi_decode_input(body)
            .map_err(|err| anyhow!("failed to decode {}: {err}", function.signature()))?;
        let args = function
            .inputs
            .iter()
            .map(|param| param.name.clone())
            .zip(values)
            .collect();
        Ok(Some(DecodedCall {
            function: function.clone(),
            args,
        }))
    }

    pub fn event_by_topic(&self, topic: &B256) -> Option<&Event> {
        self.abi.events().find(|event| event.selector() == *topic)
    }

    pub fn decode_event(&self, log: &LogData) -> Result<Option<DecodedEvent>> {
        let Some(event) = log.topics().first().and_then(|topic| self.event_by_topic(topic)) else {
            return Ok(None);
        };
        let decoded = event
            .decode_log(log)
            .map_err(|err| anyhow!("failed to decode {} log: {err}", event.name))?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(event.inputs.len());
        for input in &event.inputs {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            if let Some(value) = value {
                fields.push((input.name.clone(), value));
            }
        }
        Ok(Some(DecodedEvent {
            name: event.name.clone(),
            fields,
        }))
    }
}

impl DecodedCall {
    pub fn signature(&self) -> String {
        self.function.signature()
    }

    pub fn encode(&self) -> Result<Bytes> {
        let values: Vec<DynSolValue> = self.args.iter().map(|(_, value)| value.clone()).collect();
        let data = self
            .function
            .abi_encode_input(&values)
            .map_err(|err| anyhow!("failed to encode {}: {err}", self.signature()))?;
        Ok(Bytes::from(data))
    }
}

/// Wallet and token descriptors, loaded once per command.
#[derive(Debug, Clone)]
pub struct Descriptors {
    pub wallet: MethodSet,
    pub erc20: MethodSet,
}

impl Descriptors {
    pub fn load() -> Result<Self> {
        Ok(Self {
            wallet: MethodSet::wallet()?,
            erc20: MethodSet::erc20()?,
        })
    }

    pub fn decode(&self, calldata: &[u8]) -> Result<Option<DecodedCall>> {
        if let Some(call) = self.wallet.decode(calldata)? {
            return Ok(Some(call));
        }
        self.erc20.decode(calldata)
    }

    /// Human-readable lines for a data payload: the decoded call when the
    /// selector is known, otherwise the payload as text or hex.
    pub fn describe(&self, data: &[u8], denom: &Denomination) -> Vec<String> {
        if data.is_empty() {
            return Vec::new();
        }
        match self.decode(data) {
            Ok(Some(call)) => {
                let mut lines = vec![format!("Method: {}", call.signature())];
                for (name, value) in &call.args {
                    let label = if name.is_empty() { "arg" } else { name.as_str() };
                    match value {
                        DynSolValue::Bytes(inner) if !inner.is_empty() => {
                            lines.push(format!("{label}: {}", format_hex(inner)));
                            for line in self.describe(inner, denom) {
                                lines.push(format!("  {line}"));
                            }
                        }
                        DynSolValue::Uint(amount, _)
                            if name == "value" && call.function.name == "submitTransaction" =>
                        {
                            lines.push(format!("{label}: {}", denom.format_auto(*amount, None)));
                        }
                        other => lines.push(format!("{label}: {}", format_value(other))),
                    }
                }
                lines
            }
            Ok(None) | Err(_) => match printable_text(data) {
                Some(text) => vec![format!("Message: {text}")],
                None => vec![format!("Data: {}", format_hex(data))],
            },
        }
    }
}

pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(address) => format!("{address:#x}"),
        DynSolValue::Bool(flag) => flag.to_string(),
        DynSolValue::Uint(number, _) => number.to_string(),
        DynSolValue::Int(number, _) => number.to_string(),
        DynSolValue::FixedBytes(word, size) => format_hex(&word[..*size]),
        DynSolValue::Bytes(bytes) => format_hex(bytes),
        DynSolValue::String(text) => text.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn encodes_with_selector_matching_signature() {
        let wallet = MethodSet::wallet().expect("abi");
        let data = wallet
            .encode("confirmTransaction", &[DynSolValue::from(U256::from(7u64))])
            .expect("encode");
        let selector = alloy_primitives::keccak256("confirmTransaction(uint256)");
        assert_eq!(&data[..4], &selector[..4]);
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn unknown_method_is_reported() {
        let wallet = MethodSet::wallet().expect("abi");
        let err = wallet.encode("selfDestruct", &[]).unwrap_err();
        assert!(err.to_string().contains("method not found"));
    }

    #[test]
    fn type_mismatch_surfaces() {
        let wallet = MethodSet::wallet().expect("abi");
        assert!(wallet
            .encode("addOwner", &[DynSolValue::from(U256::from(1u64))])
            .is_err());
        assert!(wallet.encode("replaceOwner", &[]).is_err());
    }

    #[test]
    fn decode_then_encode_reproduces_calldata() {
        let wallet = MethodSet::wallet().expect("abi");
        let data = wallet
            .encode(
                "submitTransaction",
                &[
                    DynSolValue::from(address!("00000000000000000000000000000000000000aa")),
                    DynSolValue::from(U256::from(1_500_000_000_000_000_000u128)),
                    DynSolValue::Bytes(b"rent".to_vec()),
                ],
            )
            .expect("encode");
        let call = wallet.decode(&data).expect("decode").expect("known selector");
        assert_eq!(call.signature(), "submitTransaction(address,uint256,bytes)");
        assert_eq!(call.args[0].0, "destination");
        assert_eq!(call.encode().expect("re-encode"), data);
    }

    #[test]
    fn unknown_selector_is_opaque() {
        let wallet = MethodSet::wallet().expect("abi");
        assert!(wallet.decode(b"hello world").expect("decode").is_none());
        assert!(wallet.decode(&[0x01, 0x02]).expect("decode").is_none());
    }

    #[test]
    fn json_descriptors_agree_with_typed_bindings() {
        let wallet = MethodSet::wallet().expect("abi");
        let erc20 = MethodSet::erc20().expect("abi");
        assert_eq!(
            wallet.function("getConfirmations").expect("fn").selector().0,
            getConfirmationsCall::SELECTOR
        );
        assert_eq!(
            erc20.function("balanceOf").expect("fn").selector().0,
            balanceOfCall::SELECTOR
        );
        let submission = wallet
            .event_by_topic(&Submission::SIGNATURE_HASH)
            .expect("submission event");
        assert_eq!(submission.name, "Submission");
    }

    #[test]
    fn describe_nested_token_transfer() {
        let descriptors = Descriptors::load().expect("abi");
        let token = address!("00000000000000000000000000000000000000bb");
        let inner = descriptors
            .erc20
            .encode(
                "transfer",
                &[
                    DynSolValue::from(address!("00000000000000000000000000000000000000cc")),
                    DynSolValue::from(U256::from(25u64)),
                ],
            )
            .expect("transfer");
        let outer = descriptors
            .wallet
            .encode(
                "submitTransaction",
                &[
                    DynSolValue::from(token),
                    DynSolValue::from(U256::ZERO),
                    DynSolValue::Bytes(inner.to_vec()),
                ],
            )
            .expect("submit");
        let lines = descriptors.describe(&outer, &Denomination::default());
        assert_eq!(lines[0], "Method: submitTransaction(address,uint256,bytes)");
        assert!(lines.iter().any(|line| line.contains("transfer(address,uint256)")));
        assert_eq!(
            descriptors.describe(b"lunch money", &Denomination::default()),
            vec!["Message: lunch money".to_string()]
        );
    }

    #[test]
    fn decodes_indexed_event_fields() {
        let wallet = MethodSet::wallet().expect("abi");
        let owner = address!("00000000000000000000000000000000000000dd");
        let confirmation = wallet
            .abi
            .events()
            .find(|event| event.name == "Confirmation")
            .expect("event")
            .selector();
        let log = LogData::new_unchecked(
            vec![
                confirmation,
                owner.into_word(),
                B256::from(U256::from(3u64).to_be_bytes::<32>()),
            ],
            Bytes::new(),
        );
        let event = wallet.decode_event(&log).expect("decode").expect("known");
        assert_eq!(event.name, "Confirmation");
        assert_eq!(event.fields[0].0, "sender");
        assert_eq!(event.fields[1].1, DynSolValue::from(U256::from(3u64)));
    }
}
