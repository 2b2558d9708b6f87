//! Host circuit
//!
//! Wraps a guest ([`AppCircuit`]) and binds everything it sees to three
//! public commitments:
//!
//! 1. every slot is packed, MiMC-hashed and checked against the supplied
//!    per-slot commitment (the dummy constant when toggled off), and the
//!    slots are aggregated into a Merkle root;
//! 2. the toggle bitmap is packed 32 toggles per leaf into a second root;
//! 3. after the guest runs, its output bytes are hashed with Keccak256 and
//!    split into two 128-bit limbs.
//!
//! [`dry_run`] evaluates the circuit without the output assertion to learn
//! the output; [`check_satisfied`] evaluates it fully constrained.

use crate::builder::{CircuitBuilder, Variable};
use crate::circuit_api::{CircuitApi, DEFAULT_MAX_OUTPUT_BYTES};
use crate::commitment::TOGGLES_PER_LEAF;
use crate::data::{Allocation, DataInputVars, DataPointVars, RecordVar};
use crate::errors::{CircuitError, Result};
use crate::field::Fr;
use crate::gadgets::{keccak256_bits, merkle_root, mimc_hash, Bit};
use crate::input::CircuitInput;
use crate::output::OutputCommitment;
use crate::solver::Solver;
use crate::types::B256;
use core::fmt;
use tracing::{debug, info, info_span};

/// A guest circuit
pub trait AppCircuit {
    /// Slots reserved per category.
    fn allocate(&self) -> Allocation;

    /// Upper bound on the bytes the guest writes with `output_*`.
    fn max_output_bytes(&self) -> usize {
        DEFAULT_MAX_OUTPUT_BYTES
    }

    fn define<B: CircuitBuilder>(
        &self,
        api: &mut CircuitApi<B>,
        data: &DataInputVars,
    ) -> Result<()>;
}

/// Progress of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uncommitted,
    InputCommitted,
    GuestEvaluated,
    OutputCommitted,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uncommitted => "uncommitted",
            Phase::InputCommitted => "input committed",
            Phase::GuestEvaluated => "guest evaluated",
            Phase::OutputCommitted => "output committed",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Whether the output commitment is asserted against the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compute the output commitment without asserting it
    DryRun,
    /// Assert every commitment
    Prove,
}

/// Wires of the output commitment
#[derive(Debug, Clone, Copy)]
pub struct OutputCommitmentVars {
    pub hi: Variable,
    pub lo: Variable,
}

/// A defined circuit: the backend after definition plus the output wires
pub struct Defined<B> {
    pub api: CircuitApi<B>,
    pub output_commitment: OutputCommitmentVars,
    pub phase: Phase,
}

/// Guest bound to one input
pub struct HostCircuit<'a, G> {
    input: &'a CircuitInput,
    guest: &'a G,
}

impl<'a, G: AppCircuit> HostCircuit<'a, G> {
    pub fn new(input: &'a CircuitInput, guest: &'a G) -> Self {
        Self { input, guest }
    }

    /// Emit the whole circuit on `builder`.
    ///
    /// Configuration errors are returned before any wire is allocated.
    /// Errors raised by the guest are wrapped in
    /// [`CircuitError::NoOutputCommitment`] since the output stage is never
    /// reached.
    pub fn define<B: CircuitBuilder>(&self, builder: B, mode: Mode) -> Result<Defined<B>> {
        let allocation = self.guest.allocate();
        allocation.validate()?;
        self.input.check_shape(&allocation)?;
        let expected_output = match mode {
            Mode::Prove => Some(self.input.output_commitment().ok_or_else(|| {
                CircuitError::InputShape("input carries no output commitment".into())
            })?),
            Mode::DryRun => None,
        };

        let span = info_span!("host_circuit", ?mode, data_points = allocation.data_points());
        let _enter = span.enter();

        let mut phase = Phase::Uncommitted;
        let mut api = CircuitApi::new(builder, self.guest.max_output_bytes());

        let b = api.builder();
        let root = b.public_input(self.input.input_commitments_root());
        let toggles_root = b.public_input(self.input.toggles_commitment());
        let expected_output = expected_output.map(|c| {
            let hi = b.public_input(c.hi);
            let lo = b.public_input(c.lo);
            OutputCommitmentVars { hi, lo }
        });

        let data = self.input.data().assign(b);
        self.commit_input(b, &data, &allocation, root, toggles_root);
        phase = advance(phase, Phase::InputCommitted, b);

        self.guest
            .define(&mut api, &data)
            .map_err(|err| CircuitError::NoOutputCommitment(Box::new(err)))?;
        phase = advance(phase, Phase::GuestEvaluated, api.builder());

        let bits = api.output().bits().to_vec();
        let output_commitment = commit_output(api.builder(), &bits);
        phase = advance(phase, Phase::OutputCommitted, api.builder());

        if let Some(expected) = expected_output {
            let b = api.builder();
            b.assert_is_equal(output_commitment.hi, expected.hi);
            b.assert_is_equal(output_commitment.lo, expected.lo);
        }
        phase = advance(phase, Phase::Done, api.builder());

        Ok(Defined {
            api,
            output_commitment,
            phase,
        })
    }

    fn commit_input<B: CircuitBuilder>(
        &self,
        b: &mut B,
        data: &DataInputVars,
        allocation: &Allocation,
        root: Variable,
        toggles_root: Variable,
    ) {
        let dummies = self.input.dummies();
        let mut slots = Vec::with_capacity(allocation.data_points());
        commit_points(b, &data.receipts, dummies.receipt, &mut slots);
        commit_points(b, &data.storage_slots, dummies.storage, &mut slots);
        commit_points(b, &data.transactions, dummies.transaction, &mut slots);
        while slots.len() < allocation.data_points() {
            slots.push(b.constant(dummies.padding()));
        }

        for (computed, supplied) in slots.iter().zip(self.input.input_commitments()) {
            let supplied = b.secret_input(*supplied);
            b.assert_is_equal(*computed, supplied);
        }
        let computed_root = merkle_root(b, &slots);
        b.assert_is_equal(computed_root, root);

        let mut toggles: Vec<Variable> = data
            .receipts
            .toggles
            .iter()
            .chain(&data.storage_slots.toggles)
            .chain(&data.transactions.toggles)
            .copied()
            .collect();
        let zero = b.zero();
        toggles.resize(allocation.data_points(), zero);
        let leaves: Vec<Variable> = toggles
            .chunks(TOGGLES_PER_LEAF)
            .map(|word| {
                let packed = b.from_binary(word);
                mimc_hash(b, &[packed])
            })
            .collect();
        let computed_toggles = merkle_root(b, &leaves);
        b.assert_is_equal(computed_toggles, toggles_root);
    }
}

fn advance<B: CircuitBuilder>(from: Phase, to: Phase, b: &B) -> Phase {
    debug!(%from, %to, constraints = b.constraint_count(), "phase");
    to
}

/// Per-slot commitments of one category: the record's MiMC hash when the
/// toggle is on, the dummy constant otherwise.
fn commit_points<B: CircuitBuilder, V: RecordVar>(
    b: &mut B,
    points: &DataPointVars<V>,
    dummy: Fr,
    out: &mut Vec<Variable>,
) {
    let dummy = b.constant(dummy);
    for (record, toggle) in points.raw.iter().zip(&points.toggles) {
        b.assert_is_boolean(*toggle);
        let packed = record.pack(b);
        let hash = mimc_hash(b, &packed);
        out.push(b.select(*toggle, hash, dummy));
    }
}

/// Keccak256 of the output bits, as `{hi, lo}` wires.
fn commit_output<B: CircuitBuilder>(b: &mut B, bits: &[Variable]) -> OutputCommitmentVars {
    let message: Vec<Bit> = bits.iter().map(|v| Bit::Var(*v)).collect();
    let hash = keccak256_bits(b, &message);
    // hash bit 8i+j is bit j of byte i; recompose each half big-endian
    let mut limb = |bytes: core::ops::Range<usize>| {
        let le: Vec<Variable> = bytes
            .rev()
            .flat_map(|i| hash[8 * i..8 * i + 8].to_vec())
            .map(|bit| bit.to_variable(b))
            .collect();
        b.from_binary(&le)
    };
    let hi = limb(0..16);
    let lo = limb(16..32);
    OutputCommitmentVars { hi, lo }
}

/// Concrete result of a solved evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub output_commitment: OutputCommitment,
    pub output: Vec<u8>,
    /// Digest of the constraint structure
    pub fingerprint: B256,
    pub constraints: usize,
    pub public_values: Vec<Fr>,
}

fn solve<G: AppCircuit>(input: &CircuitInput, guest: &G, mode: Mode) -> Result<Evaluation> {
    let defined = HostCircuit::new(input, guest).define(Solver::new(), mode)?;
    let (solver, output) = defined.api.into_parts();
    solver.check()?;
    let value = |v: Variable| {
        solver.value(v).ok_or_else(|| {
            CircuitError::NoOutputCommitment(Box::new(CircuitError::Guest(
                "output commitment was not evaluated".into(),
            )))
        })
    };
    let output_commitment = OutputCommitment {
        hi: value(defined.output_commitment.hi)?,
        lo: value(defined.output_commitment.lo)?,
    };
    let output = output.to_bytes(&solver).ok_or_else(|| {
        CircuitError::Guest("output bytes were not evaluated".into())
    })?;
    let evaluation = Evaluation {
        output_commitment,
        output,
        fingerprint: solver.fingerprint(),
        constraints: solver.constraint_count(),
        public_values: solver.public_values(),
    };
    info!(
        ?mode,
        constraints = evaluation.constraints,
        output_bytes = evaluation.output.len(),
        commitment = %evaluation.output_commitment,
        "circuit solved"
    );
    Ok(evaluation)
}

/// Evaluate once without asserting the output commitment; returns the
/// commitment and the output bytes the guest produced.
pub fn dry_run<G: AppCircuit>(
    input: &CircuitInput,
    guest: &G,
) -> Result<(OutputCommitment, Vec<u8>)> {
    let evaluation = solve(input, guest, Mode::DryRun)?;
    Ok((evaluation.output_commitment, evaluation.output))
}

/// Evaluate with every commitment asserted.
pub fn check_satisfied<G: AppCircuit>(input: &CircuitInput, guest: &G) -> Result<Evaluation> {
    solve(input, guest, Mode::Prove)
}

/// Dry-run `input` and attach the output to it.
pub fn complete<G: AppCircuit>(input: CircuitInput, guest: &G) -> Result<CircuitInput> {
    let (commitment, output) = dry_run(&input, guest)?;
    Ok(input.with_output(commitment, output))
}
