//! Governance proposals and vote-cast transactions.
//!
//! A vote is a single account-signed transaction: one account input
//! paying exactly the fee, no outputs, one public vote-cast certificate.
//! The account witness commits to the current spending counter, so
//! every vote consumes it.

use chainwallet_chain::fragment::{fragment_id, Fragment};
use chainwallet_chain::settings::Settings;
use chainwallet_chain::transaction::{
    account_witness_message, Input, TransactionBuilder, VoteCast, VotePayload, Witness,
};
use chainwallet_types::{FragmentId, PayloadType, Result, Value, VotePlanId, WalletError};

use crate::account::Account;

/// Width of the public payload's choice bitmap.
pub const MAX_NUM_CHOICES: u8 = 16;

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// A proposal inside a vote plan.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Proposal {
    vote_plan: VotePlanId,
    payload_type: PayloadType,
    index: u8,
    num_choices: u8,
}

impl Proposal {
    /// Describes a proposal.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidNumChoices`] unless `num_choices` is in
    /// `1..=16`.
    pub fn new(
        vote_plan: VotePlanId,
        payload_type: PayloadType,
        index: u8,
        num_choices: u8,
    ) -> Result<Self> {
        if num_choices == 0 || num_choices > MAX_NUM_CHOICES {
            return Err(WalletError::InvalidNumChoices {
                reason: format!("{num_choices} choices, expected 1..={MAX_NUM_CHOICES}"),
            });
        }
        Ok(Self {
            vote_plan,
            payload_type,
            index,
            num_choices,
        })
    }

    /// Public proposal.
    pub fn new_public(vote_plan: VotePlanId, index: u8, num_choices: u8) -> Result<Self> {
        Self::new(vote_plan, PayloadType::Public, index, num_choices)
    }

    /// Like [`new`](Self::new) but with the payload type as a raw byte.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] for an unknown payload type, then
    /// the errors of [`new`](Self::new).
    pub fn from_raw(
        vote_plan: [u8; 32],
        payload_type: u8,
        index: u8,
        num_choices: u8,
    ) -> Result<Self> {
        Self::new(
            VotePlanId::new(vote_plan),
            PayloadType::try_from(payload_type)?,
            index,
            num_choices,
        )
    }

    /// Vote plan id.
    pub fn vote_plan(&self) -> VotePlanId {
        self.vote_plan
    }

    /// Payload type.
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Position inside the vote plan.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Number of valid choices.
    pub fn num_choices(&self) -> u8 {
        self.num_choices
    }

    /// Certificate casting `choice`.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidChoice`] unless `choice < num_choices`.
    pub fn vote_cast(&self, choice: u8) -> Result<VoteCast> {
        if choice >= self.num_choices {
            return Err(WalletError::InvalidChoice {
                reason: format!(
                    "choice {choice} out of range for {} choices",
                    self.num_choices
                ),
            });
        }
        let payload = match self.payload_type {
            PayloadType::Public => VotePayload::Public { choice },
        };
        Ok(VoteCast {
            vote_plan: self.vote_plan,
            proposal_index: self.index,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Vote transaction
// ---------------------------------------------------------------------------

/// Encoded vote-cast fragment.
#[derive(Debug)]
pub struct VoteTransaction {
    /// Fragment id.
    pub fragment_id: FragmentId,
    /// Encoded fragment, owned by the caller.
    pub bytes: Vec<u8>,
    /// Fee debited from the account.
    pub fee: Value,
}

/// Builds and signs a vote with the account's current counter.
///
/// Does not touch the account state; the caller records the result.
pub fn build_vote(
    settings: &Settings,
    account: &Account,
    proposal: &Proposal,
    choice: u8,
) -> Result<VoteTransaction> {
    let vote_cast = proposal.vote_cast(choice)?;
    let fee = settings.fees.calculate(1, 0, true);

    let mut builder = TransactionBuilder::new(settings);
    builder
        .add_input(Input::Account {
            account: account.public_key(),
            value: fee,
        })
        .set_vote_cast(vote_cast);

    let message = account_witness_message(
        &settings.block0_hash,
        &builder.sign_data_hash()?,
        account.counter(),
    );
    let tx = builder.seal(vec![Witness::Account(account.sign(&message))])?;

    let bytes = Fragment::VoteCast(tx).to_bytes()?;
    Ok(VoteTransaction {
        fragment_id: fragment_id(&bytes),
        bytes,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: [u8; 32] = [0xaa; 32];

    #[test]
    fn num_choices_bounds() {
        assert!(matches!(
            Proposal::from_raw(PLAN, 1, 0, 0),
            Err(WalletError::InvalidNumChoices { .. })
        ));
        assert!(matches!(
            Proposal::from_raw(PLAN, 1, 0, 200),
            Err(WalletError::InvalidNumChoices { .. })
        ));
        assert!(Proposal::from_raw(PLAN, 1, 0, 1).is_ok());
        assert!(Proposal::from_raw(PLAN, 1, 0, 16).is_ok());
        assert!(Proposal::from_raw(PLAN, 1, 0, 17).is_err());
    }

    #[test]
    fn unknown_payload_type_rejected() {
        assert!(matches!(
            Proposal::from_raw(PLAN, 2, 0, 3),
            Err(WalletError::InvalidInput { .. })
        ));
    }

    #[test]
    fn choice_must_be_below_num_choices() -> std::result::Result<(), WalletError> {
        let proposal = Proposal::new_public(VotePlanId::new(PLAN), 4, 3)?;
        let cast = proposal.vote_cast(2)?;
        assert_eq!(cast.proposal_index, 4);
        assert_eq!(cast.payload, VotePayload::Public { choice: 2 });
        assert!(matches!(
            proposal.vote_cast(3),
            Err(WalletError::InvalidChoice { .. })
        ));
        Ok(())
    }
}
