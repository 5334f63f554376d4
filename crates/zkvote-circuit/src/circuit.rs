//! Score circuit
//!
//! Proves, for a disclosed `points` and `judge`, that the prover knows a
//! `participant` and `nonce` such that
//!
//! - `0 <= points <= 100`, and
//! - `binding == Poseidon(judge, participant, points, nonce_hi, nonce_lo)`.
//!
//! ## Public inputs (instance column)
//!
//! | row | value |
//! |-----|-------|
//! | 0 | binding |
//! | 1 | points |
//! | 2 | judge |
//!
//! ## Range check
//!
//! Both `points` and `slack = 100 - points` are decomposed into 7 bits
//! (MSB first, running sum `acc' = 2 * acc + bit`). Each is below 128, so
//! `points + slack = 100` holds over the integers and no wrap-around in the
//! field can hide an out-of-range score.

use ff::PrimeField;
use halo2_gadgets::poseidon::{
    primitives::{self as poseidon, ConstantLength, P128Pow5T3},
    Hash as PoseidonHash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    arithmetic::Field,
    circuit::{AssignedCell, Chip, Layouter, SimpleFloorPlanner, Value},
    plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Expression, Instance, Selector},
    poly::Rotation,
};
use halo2curves::pasta::Fp;
use zkvote_runtime::{Address, EncodedVote, B256, MAX_POINTS};

/// Bits per range-checked value; 2^7 = 128 > 100
pub const RANGE_BITS: usize = 7;

/// Number of field elements absorbed by the binding hash
pub const BINDING_INPUTS: usize = 5;

pub const BINDING_ROW: usize = 0;
pub const POINTS_ROW: usize = 1;
pub const JUDGE_ROW: usize = 2;

const POSEIDON_WIDTH: usize = 3;
const POSEIDON_RATE: usize = 2;

#[derive(Clone, Debug)]
pub struct ScoreConfig {
    advice: [Column<Advice>; 3],
    instance: Column<Instance>,
    s_decompose: Selector,
    s_slack: Selector,
    poseidon: Pow5Config<Fp, POSEIDON_WIDTH, POSEIDON_RATE>,
}

#[derive(Clone, Debug)]
pub struct ScoreChip {
    config: ScoreConfig,
}

impl Chip<Fp> for ScoreChip {
    type Config = ScoreConfig;
    type Loaded = ();

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn loaded(&self) -> &Self::Loaded {
        &()
    }
}

/// Cells holding the private vote, loaded once and copied everywhere else
struct VoteCells {
    judge: AssignedCell<Fp, Fp>,
    participant: AssignedCell<Fp, Fp>,
    points: AssignedCell<Fp, Fp>,
    nonce_hi: AssignedCell<Fp, Fp>,
    nonce_lo: AssignedCell<Fp, Fp>,
}

impl ScoreChip {
    pub fn construct(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn configure(meta: &mut ConstraintSystem<Fp>) -> ScoreConfig {
        let advice = [meta.advice_column(), meta.advice_column(), meta.advice_column()];
        let instance = meta.instance_column();

        for col in &advice {
            meta.enable_equality(*col);
        }
        meta.enable_equality(instance);

        let state = [meta.advice_column(), meta.advice_column(), meta.advice_column()];
        let partial_sbox = meta.advice_column();
        let rc_a = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        let rc_b = [meta.fixed_column(), meta.fixed_column(), meta.fixed_column()];
        meta.enable_constant(rc_b[0]);

        let poseidon =
            Pow5Chip::configure::<P128Pow5T3>(meta, state, partial_sbox, rc_a, rc_b);

        let s_decompose = meta.selector();
        let s_slack = meta.selector();

        // bit * (1 - bit) == 0 and acc_next == 2 * acc + bit
        meta.create_gate("bit_decompose", |meta| {
            let s = meta.query_selector(s_decompose);
            let bit = meta.query_advice(advice[0], Rotation::cur());
            let acc = meta.query_advice(advice[2], Rotation::cur());
            let acc_next = meta.query_advice(advice[2], Rotation::next());
            let one = Expression::Constant(Fp::ONE);
            let two = Expression::Constant(Fp::from(2));

            vec![
                s.clone() * bit.clone() * (one - bit.clone()),
                s * (acc * two + bit - acc_next),
            ]
        });

        // points + slack == MAX_POINTS
        meta.create_gate("slack", |meta| {
            let s = meta.query_selector(s_slack);
            let points = meta.query_advice(advice[0], Rotation::cur());
            let slack = meta.query_advice(advice[1], Rotation::cur());
            let max = Expression::Constant(Fp::from(MAX_POINTS as u64));

            vec![s * (points + slack - max)]
        });

        ScoreConfig { advice, instance, s_decompose, s_slack, poseidon }
    }

    fn load_vote(
        &self,
        mut layouter: impl Layouter<Fp>,
        circuit: &ScoreCircuit,
    ) -> Result<VoteCells, Error> {
        layouter.assign_region(
            || "load vote",
            |mut region| {
                let [a0, a1, a2] = self.config.advice;

                Ok(VoteCells {
                    judge: region.assign_advice(|| "judge", a0, 0, || circuit.judge)?,
                    participant: region.assign_advice(
                        || "participant",
                        a1,
                        0,
                        || circuit.participant,
                    )?,
                    points: region.assign_advice(|| "points", a2, 0, || circuit.points)?,
                    nonce_hi: region.assign_advice(|| "nonce_hi", a0, 1, || circuit.nonce_hi)?,
                    nonce_lo: region.assign_advice(|| "nonce_lo", a1, 1, || circuit.nonce_lo)?,
                })
            },
        )
    }

    fn assign_slack(
        &self,
        mut layouter: impl Layouter<Fp>,
        points: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "slack",
            |mut region| {
                self.config.s_slack.enable(&mut region, 0)?;

                let points =
                    points.copy_advice(|| "points", &mut region, self.config.advice[0], 0)?;
                let slack = points.value().map(|p| Fp::from(MAX_POINTS as u64) - p);

                region.assign_advice(|| "slack", self.config.advice[1], 0, || slack)
            },
        )
    }

    fn assign_range_check(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
        bits: &[Value<Fp>],
    ) -> Result<(), Error> {
        layouter.assign_region(
            || "range_check",
            |mut region| {
                let mut acc = Value::known(Fp::ZERO);
                let mut acc_cell = region.assign_advice_from_constant(
                    || "acc_0",
                    self.config.advice[2],
                    0,
                    Fp::ZERO,
                )?;

                for (i, bit) in bits.iter().enumerate() {
                    self.config.s_decompose.enable(&mut region, i)?;

                    region.assign_advice(
                        || format!("bit_{}", i),
                        self.config.advice[0],
                        i,
                        || *bit,
                    )?;

                    acc = acc.zip(*bit).map(|(acc, b)| acc.double() + b);
                    acc_cell = region.assign_advice(
                        || format!("acc_{}", i + 1),
                        self.config.advice[2],
                        i + 1,
                        || acc,
                    )?;
                }

                region.constrain_equal(acc_cell.cell(), value.cell())
            },
        )
    }
}

/// Native values of one vote, mapped into the Pasta scalar field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreWitness {
    pub judge: Fp,
    pub participant: Fp,
    pub points: u64,
    pub nonce_hi: Fp,
    pub nonce_lo: Fp,
}

impl ScoreWitness {
    pub fn from_vote(vote: &EncodedVote) -> Self {
        let nonce = vote.nonce.as_slice();
        Self {
            judge: address_to_field(&vote.judge),
            participant: address_to_field(&vote.participant),
            points: vote.points,
            nonce_hi: Fp::from_u128(be_u128(&nonce[..16])),
            nonce_lo: Fp::from_u128(be_u128(&nonce[16..])),
        }
    }

    /// Poseidon binding computed outside the circuit
    pub fn binding(&self) -> Fp {
        let message =
            [self.judge, self.participant, Fp::from(self.points), self.nonce_hi, self.nonce_lo];
        poseidon::Hash::<
            _,
            P128Pow5T3,
            ConstantLength<BINDING_INPUTS>,
            POSEIDON_WIDTH,
            POSEIDON_RATE,
        >::init()
        .hash(message)
    }

    /// Instance column values in row order
    pub fn instances(&self) -> Vec<Fp> {
        let mut column = vec![Fp::ZERO; 3];
        column[BINDING_ROW] = self.binding();
        column[POINTS_ROW] = Fp::from(self.points);
        column[JUDGE_ROW] = self.judge;
        column
    }
}

/// 20 address bytes as a field element (big-endian integer, always < p)
pub fn address_to_field(address: &Address) -> Fp {
    let bytes = address.as_slice();
    let hi = Fp::from_u128(be_u128(&bytes[..4]));
    let lo = Fp::from_u128(be_u128(&bytes[4..]));
    hi * two_pow_128() + lo
}

pub fn field_to_b256(value: &Fp) -> B256 {
    B256::from(value.to_repr())
}

/// `None` when the bytes are not a canonical field element.
pub fn b256_to_field(value: &B256) -> Option<Fp> {
    let mut repr = [0u8; 32];
    repr.copy_from_slice(value.as_slice());
    Option::from(Fp::from_repr(repr))
}

fn two_pow_128() -> Fp {
    Fp::from_u128(1u128 << 64).square()
}

fn be_u128(bytes: &[u8]) -> u128 {
    bytes.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b))
}

/// MSB-first bits of the low `RANGE_BITS` bits of `value`
fn bits_of(value: u64) -> Vec<Value<Fp>> {
    (0..RANGE_BITS)
        .rev()
        .map(|i| Value::known(Fp::from((value >> i) & 1)))
        .collect()
}

#[derive(Clone, Debug)]
pub struct ScoreCircuit {
    pub judge: Value<Fp>,
    pub participant: Value<Fp>,
    pub points: Value<Fp>,
    pub nonce_hi: Value<Fp>,
    pub nonce_lo: Value<Fp>,
    pub points_bits: Vec<Value<Fp>>,
    pub slack_bits: Vec<Value<Fp>>,
}

impl Default for ScoreCircuit {
    fn default() -> Self {
        Self {
            judge: Value::unknown(),
            participant: Value::unknown(),
            points: Value::unknown(),
            nonce_hi: Value::unknown(),
            nonce_lo: Value::unknown(),
            points_bits: vec![Value::unknown(); RANGE_BITS],
            slack_bits: vec![Value::unknown(); RANGE_BITS],
        }
    }
}

impl ScoreCircuit {
    /// Builds the circuit for any witness. An out-of-range score yields a
    /// circuit that does not satisfy its constraints rather than a panic.
    pub fn new(witness: &ScoreWitness) -> Self {
        let slack = (MAX_POINTS as u64).wrapping_sub(witness.points);

        Self {
            judge: Value::known(witness.judge),
            participant: Value::known(witness.participant),
            points: Value::known(Fp::from(witness.points)),
            nonce_hi: Value::known(witness.nonce_hi),
            nonce_lo: Value::known(witness.nonce_lo),
            points_bits: bits_of(witness.points),
            slack_bits: bits_of(slack),
        }
    }
}

impl Circuit<Fp> for ScoreCircuit {
    type Config = ScoreConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::default()
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        ScoreChip::configure(meta)
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<Fp>,
    ) -> Result<(), Error> {
        let chip = ScoreChip::construct(config.clone());

        let cells = chip.load_vote(layouter.namespace(|| "load_vote"), self)?;

        // 1. 0 <= points <= 100
        let slack = chip.assign_slack(layouter.namespace(|| "slack"), &cells.points)?;
        chip.assign_range_check(
            layouter.namespace(|| "points_range"),
            &cells.points,
            &self.points_bits,
        )?;
        chip.assign_range_check(layouter.namespace(|| "slack_range"), &slack, &self.slack_bits)?;

        // 2. binding = Poseidon(judge, participant, points, nonce_hi, nonce_lo)
        let poseidon_chip = Pow5Chip::construct(config.poseidon.clone());
        let hasher = PoseidonHash::<
            _,
            _,
            P128Pow5T3,
            ConstantLength<BINDING_INPUTS>,
            POSEIDON_WIDTH,
            POSEIDON_RATE,
        >::init(poseidon_chip, layouter.namespace(|| "poseidon_init"))?;
        let binding = hasher.hash(
            layouter.namespace(|| "binding"),
            [
                cells.judge.clone(),
                cells.participant,
                cells.points.clone(),
                cells.nonce_hi,
                cells.nonce_lo,
            ],
        )?;

        layouter.constrain_instance(binding.cell(), config.instance, BINDING_ROW)?;
        layouter.constrain_instance(cells.points.cell(), config.instance, POINTS_ROW)?;
        layouter.constrain_instance(cells.judge.cell(), config.instance, JUDGE_ROW)?;

        Ok(())
    }
}
