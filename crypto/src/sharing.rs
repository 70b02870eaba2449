//! Secret sharing over monotone access structures.
//!
//! An access structure is a tree of AND / OR / THRESHOLD nodes over named
//! leaves. Sharing walks the tree top-down (additive splits at AND nodes,
//! replication at OR nodes, Shamir polynomials at THRESHOLD nodes);
//! reconstruction walks it bottom-up, treating missing branches as "try
//! the next one" at OR and THRESHOLD join points. Party identifiers for
//! threshold evaluation are derived from child names by a fixed
//! hash-to-scalar.

pub mod lagrange;

use std::collections::{BTreeMap, BTreeSet};

use crate::{
	curve::{pid_from_name, ECPoint, ECScalar},
	error::{ensure_arg, Error, Result},
	hashing::drbg::DrbgAesCtr,
	Rng,
};

use lagrange::{horner_poly, lagrange_interpolate, lagrange_interpolate_exponent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Leaf,
	And,
	Or,
	Threshold(usize),
}

/// Declarative tree description used to build an [`AccessStructure`].
#[derive(Clone, Debug)]
pub enum NodeSpec {
	Leaf(String),
	And(String, Vec<NodeSpec>),
	Or(String, Vec<NodeSpec>),
	Threshold(String, usize, Vec<NodeSpec>),
}

impl NodeSpec {
	pub fn leaf(name: &str) -> Self {
		NodeSpec::Leaf(name.into())
	}

	pub fn and(name: &str, children: Vec<NodeSpec>) -> Self {
		NodeSpec::And(name.into(), children)
	}

	pub fn or(name: &str, children: Vec<NodeSpec>) -> Self {
		NodeSpec::Or(name.into(), children)
	}

	pub fn threshold(name: &str, threshold: usize, children: Vec<NodeSpec>) -> Self {
		NodeSpec::Threshold(name.into(), threshold, children)
	}
}

pub type NodeIndex = usize;

#[derive(Clone, Debug)]
pub struct Node {
	pub kind: NodeKind,
	pub name: String,
	children: Vec<NodeIndex>,
	parent: Option<NodeIndex>,
}

/// An access structure: an arena-allocated node tree (indices replace the
/// classical parent back-pointers). The root is always index 0 and carries
/// the empty name.
#[derive(Clone, Debug)]
pub struct AccessStructure {
	nodes: Vec<Node>,
}

impl AccessStructure {
	pub fn new(spec: NodeSpec) -> Result<Self> {
		let mut nodes = Vec::new();
		Self::build(&mut nodes, &spec, None)?;
		let ac = AccessStructure { nodes };
		ac.validate()?;
		Ok(ac)
	}

	fn build(
		nodes: &mut Vec<Node>,
		spec: &NodeSpec,
		parent: Option<NodeIndex>,
	) -> Result<NodeIndex> {
		let (kind, name, children_spec): (NodeKind, &str, &[NodeSpec]) = match spec {
			NodeSpec::Leaf(name) => (NodeKind::Leaf, name, &[]),
			NodeSpec::And(name, children) => (NodeKind::And, name, children),
			NodeSpec::Or(name, children) => (NodeKind::Or, name, children),
			NodeSpec::Threshold(name, t, children) =>
				(NodeKind::Threshold(*t), name, children),
		};

		let index = nodes.len();
		nodes.push(Node { kind, name: name.to_string(), children: Vec::new(), parent });
		for child_spec in children_spec {
			let child = Self::build(nodes, child_spec, Some(index))?;
			nodes[index].children.push(child);
		}
		Ok(index)
	}

	fn validate(&self) -> Result<()> {
		let mut names = BTreeSet::new();
		for (index, node) in self.nodes.iter().enumerate() {
			let is_root = node.parent.is_none();
			ensure_arg!(is_root == (index == 0), "malformed arena");
			if is_root {
				ensure_arg!(node.name.is_empty(), "named root node");
			} else {
				ensure_arg!(!node.name.is_empty(), "unnamed node");
				ensure_arg!(names.insert(node.name.clone()), "name duplication");
			}

			let n = node.children.len();
			match node.kind {
				NodeKind::Leaf =>
					ensure_arg!(n == 0, "leaf node must not have children"),
				NodeKind::And => ensure_arg!(n > 0, "AND node must have children"),
				NodeKind::Or => ensure_arg!(n > 0, "OR node must have children"),
				NodeKind::Threshold(t) =>
					ensure_arg!(t >= 1 && t <= n, "invalid threshold"),
			}
		}
		Ok(())
	}

	pub fn root(&self) -> NodeIndex {
		0
	}

	pub fn node(&self, index: NodeIndex) -> &Node {
		&self.nodes[index]
	}

	pub fn find(&self, name: &str) -> Option<NodeIndex> {
		self.nodes.iter().position(|node| node.name == name)
	}

	/// Children ordered by name; sharing consumes randomness in this order
	/// so that deterministic (DRBG-seeded) sharing is reproducible.
	fn sorted_children(&self, index: NodeIndex) -> Vec<NodeIndex> {
		let mut children = self.nodes[index].children.clone();
		children.sort_by(|&a, &b| self.nodes[a].name.cmp(&self.nodes[b].name));
		children
	}

	pub fn leaf_names(&self) -> BTreeSet<String> {
		self.nodes
			.iter()
			.filter(|node| node.kind == NodeKind::Leaf)
			.map(|node| node.name.clone())
			.collect()
	}

	/// Nodes whose public data participates in share verification
	/// (AND and THRESHOLD nodes).
	pub fn pub_data_nodes(&self) -> Vec<NodeIndex> {
		(0..self.nodes.len())
			.filter(|&index| {
				matches!(self.nodes[index].kind, NodeKind::And | NodeKind::Threshold(_))
			})
			.collect()
	}

	/// Pure predicate: does this set of leaf names satisfy the structure?
	pub fn enough_for_quorum(&self, names: &BTreeSet<String>) -> bool {
		self.quorum_recursive(self.root(), names)
	}

	fn quorum_recursive(&self, index: NodeIndex, names: &BTreeSet<String>) -> bool {
		let node = &self.nodes[index];
		match node.kind {
			NodeKind::Leaf => names.contains(&node.name),
			NodeKind::Or =>
				node.children.iter().any(|&child| self.quorum_recursive(child, names)),
			NodeKind::And =>
				node.children.iter().all(|&child| self.quorum_recursive(child, names)),
			NodeKind::Threshold(t) =>
				node.children
					.iter()
					.filter(|&&child| self.quorum_recursive(child, names))
					.count() >= t,
		}
	}

	// ---- sharing ----

	pub fn share<P: ECPoint>(
		&self,
		x: &P::Scalar,
		rng: &mut Rng,
	) -> BTreeMap<String, P::Scalar> {
		let mut shares = BTreeMap::new();
		self.share_recursive::<P>(
			self.root(),
			x,
			&mut Sampler::Rng(rng),
			&mut shares,
			None,
		);
		shares
	}

	/// Deterministic sharing driven by a seeded DRBG; used where the
	/// sharing must be re-derivable from a transmitted seed.
	pub fn share_with_drbg<P: ECPoint>(
		&self,
		x: &P::Scalar,
		drbg: &mut DrbgAesCtr,
	) -> BTreeMap<String, P::Scalar> {
		let mut shares = BTreeMap::new();
		self.share_recursive::<P>(
			self.root(),
			x,
			&mut Sampler::Drbg(drbg),
			&mut shares,
			None,
		);
		shares
	}

	/// Share and additionally return each internal node's scalar share and
	/// its public counterpart (share * G), keyed by node name (the root
	/// under the empty name). These allow verifying any leaf share against
	/// its ancestors without revealing other leaves.
	pub fn share_with_internals<P: ECPoint>(
		&self,
		x: &P::Scalar,
		rng: &mut Rng,
	) -> (BTreeMap<String, P::Scalar>, BTreeMap<String, P::Scalar>, BTreeMap<String, P>) {
		let mut shares = BTreeMap::new();
		let mut internals = (BTreeMap::new(), BTreeMap::new());
		self.share_recursive::<P>(
			self.root(),
			x,
			&mut Sampler::Rng(rng),
			&mut shares,
			Some(&mut internals),
		);
		(shares, internals.0, internals.1)
	}

	fn share_recursive<P: ECPoint>(
		&self,
		index: NodeIndex,
		value: &P::Scalar,
		sampler: &mut Sampler,
		shares: &mut BTreeMap<String, P::Scalar>,
		mut internals: Option<&mut (BTreeMap<String, P::Scalar>, BTreeMap<String, P>)>,
	) {
		let node = &self.nodes[index];

		if let Some(internals) = internals.as_deref_mut() {
			internals.0.insert(node.name.clone(), value.clone());
			internals.1.insert(node.name.clone(), P::from_scalar(value));
		}

		let children = self.sorted_children(index);
		match node.kind {
			NodeKind::Leaf => {
				shares.insert(node.name.clone(), value.clone());
			},
			NodeKind::Or =>
				for child in children {
					self.share_recursive::<P>(
						child,
						value,
						sampler,
						shares,
						internals.as_deref_mut(),
					);
				},
			NodeKind::And => {
				let child_values = share_and::<P>(value, children.len(), sampler);
				for (child, child_value) in children.into_iter().zip(&child_values) {
					self.share_recursive::<P>(
						child,
						child_value,
						sampler,
						shares,
						internals.as_deref_mut(),
					);
				}
			},
			NodeKind::Threshold(t) => {
				let pids: Vec<P::Scalar> = children
					.iter()
					.map(|&child| pid_from_name::<P>(&self.nodes[child].name))
					.collect();
				let (child_values, _) = share_threshold::<P>(value, t, &pids, sampler);
				for (child, child_value) in children.into_iter().zip(&child_values) {
					self.share_recursive::<P>(
						child,
						child_value,
						sampler,
						shares,
						internals.as_deref_mut(),
					);
				}
			},
		}
	}

	// ---- reconstruction ----

	pub fn reconstruct<P: ECPoint>(
		&self,
		shares: &BTreeMap<String, P::Scalar>,
	) -> Result<P::Scalar> {
		self.reconstruct_recursive::<P>(self.root(), shares)
	}

	fn reconstruct_recursive<P: ECPoint>(
		&self,
		index: NodeIndex,
		shares: &BTreeMap<String, P::Scalar>,
	) -> Result<P::Scalar> {
		let node = &self.nodes[index];
		match node.kind {
			NodeKind::Leaf => shares
				.get(&node.name)
				.cloned()
				.ok_or(Error::Insufficient("missing leaf share")),
			NodeKind::Or => {
				for &child in &node.children {
					match self.reconstruct_recursive::<P>(child, shares) {
						Ok(value) => return Ok(value),
						Err(err) if err.is_insufficient() => continue,
						Err(err) => return Err(err),
					}
				}
				Err(Error::Insufficient("no OR branch can be reconstructed"))
			},
			NodeKind::And => {
				let mut sum = P::Scalar::zero();
				for &child in &node.children {
					sum = sum + self.reconstruct_recursive::<P>(child, shares)?;
				}
				Ok(sum)
			},
			NodeKind::Threshold(t) => {
				let mut pids = Vec::with_capacity(t);
				let mut collected = Vec::with_capacity(t);
				for &child in &node.children {
					match self.reconstruct_recursive::<P>(child, shares) {
						Ok(value) => {
							pids.push(pid_from_name::<P>(&self.nodes[child].name));
							collected.push(value);
							if collected.len() == t {
								break
							}
						},
						Err(err) if err.is_insufficient() => continue,
						Err(err) => return Err(err),
					}
				}
				if collected.len() < t {
					return Err(Error::Insufficient("threshold not met"))
				}
				lagrange_interpolate(&P::Scalar::zero(), &collected, &pids)
			},
		}
	}

	/// Reconstruction in the exponent: the same traversal over points,
	/// point addition replacing scalar addition.
	pub fn reconstruct_exponent<P: ECPoint>(
		&self,
		shares: &BTreeMap<String, P>,
	) -> Result<P> {
		self.reconstruct_exponent_recursive(self.root(), shares)
	}

	fn reconstruct_exponent_recursive<P: ECPoint>(
		&self,
		index: NodeIndex,
		shares: &BTreeMap<String, P>,
	) -> Result<P> {
		let node = &self.nodes[index];
		match node.kind {
			NodeKind::Leaf => shares
				.get(&node.name)
				.copied()
				.ok_or(Error::Insufficient("missing leaf share")),
			NodeKind::Or => {
				for &child in &node.children {
					match self.reconstruct_exponent_recursive(child, shares) {
						Ok(value) => return Ok(value),
						Err(err) if err.is_insufficient() => continue,
						Err(err) => return Err(err),
					}
				}
				Err(Error::Insufficient("no OR branch can be reconstructed"))
			},
			NodeKind::And => {
				let mut sum = P::infinity();
				for &child in &node.children {
					sum = sum + self.reconstruct_exponent_recursive(child, shares)?;
				}
				Ok(sum)
			},
			NodeKind::Threshold(t) => {
				let mut pids = Vec::with_capacity(t);
				let mut collected = Vec::with_capacity(t);
				for &child in &node.children {
					match self.reconstruct_exponent_recursive(child, shares) {
						Ok(value) => {
							pids.push(pid_from_name::<P>(&self.nodes[child].name));
							collected.push(value);
							if collected.len() == t {
								break
							}
						},
						Err(err) if err.is_insufficient() => continue,
						Err(err) => return Err(err),
					}
				}
				if collected.len() < t {
					return Err(Error::Insufficient("threshold not met"))
				}
				lagrange_interpolate_exponent(&P::Scalar::zero(), &collected, &pids)
			},
		}
	}

	/// Verify a leaf's share against the public data of its ancestors:
	/// walking up the tree, each node's public share must be consistent
	/// with its children's, and the root must equal Q.
	pub fn verify_share_against_ancestors<P: ECPoint>(
		&self,
		q: &P,
		share: &P::Scalar,
		pub_data: &BTreeMap<String, P>,
		leaf: &str,
	) -> Result<()> {
		let leaf_index = self.find(leaf).ok_or(Error::NotFound("unknown leaf"))?;
		ensure_arg!(self.nodes[leaf_index].kind == NodeKind::Leaf, "node is not a leaf");

		let mut expected = P::from_scalar(share);
		let mut current = Some(leaf_index);

		while let Some(index) = current {
			let node = &self.nodes[index];
			let my_pub_share = *pub_data
				.get(&node.name)
				.ok_or(Error::NotFound("missing public data for node"))?;
			let children = self.sorted_children(index);

			match node.kind {
				NodeKind::Leaf | NodeKind::Or => {
					ensure_crypto_eq(&my_pub_share, &expected)?;
				},
				NodeKind::And => {
					let mut sum = P::infinity();
					for &child in &children {
						sum = sum +
							*pub_data
								.get(&self.nodes[child].name)
								.ok_or(Error::NotFound("missing public data for node"))?;
					}
					ensure_crypto_eq(&sum, &my_pub_share)?;
				},
				NodeKind::Threshold(t) => {
					let mut quorum = Vec::with_capacity(t);
					let mut quorum_pids = Vec::with_capacity(t);
					for &child in children.iter().take(t) {
						quorum.push(
							*pub_data
								.get(&self.nodes[child].name)
								.ok_or(Error::NotFound("missing public data for node"))?,
						);
						quorum_pids.push(pid_from_name::<P>(&self.nodes[child].name));
					}

					let at_zero = lagrange_interpolate_exponent(
						&P::Scalar::zero(),
						&quorum,
						&quorum_pids,
					)?;
					ensure_crypto_eq(&at_zero, &my_pub_share)?;

					// The remaining children must lie on the same polynomial
					for &child in children.iter().skip(t) {
						let child_pub = *pub_data
							.get(&self.nodes[child].name)
							.ok_or(Error::NotFound("missing public data for node"))?;
						let expected_child = lagrange_interpolate_exponent(
							&pid_from_name::<P>(&self.nodes[child].name),
							&quorum,
							&quorum_pids,
						)?;
						ensure_crypto_eq(&child_pub, &expected_child)?;
					}
				},
			}

			expected = my_pub_share;
			current = node.parent;
		}

		ensure_crypto_eq(q, &expected)
	}
}

fn ensure_crypto_eq<P: ECPoint>(a: &P, b: &P) -> Result<()> {
	if a != b {
		return Err(Error::Crypto("share inconsistent with public data"))
	}
	Ok(())
}

enum Sampler<'a> {
	Rng(&'a mut Rng),
	Drbg(&'a mut DrbgAesCtr),
}

impl Sampler<'_> {
	fn sample<P: ECPoint>(&mut self) -> P::Scalar {
		match self {
			Sampler::Rng(rng) => P::Scalar::random(rng),
			Sampler::Drbg(drbg) => crate::curve::scalar_from_drbg::<P>(drbg),
		}
	}
}

/// Additive split: n - 1 random shares and one correction share summing
/// to x.
fn share_and<P: ECPoint>(x: &P::Scalar, n: usize, sampler: &mut Sampler) -> Vec<P::Scalar> {
	assert!(n > 0, "AND split of zero children");
	let mut shares = Vec::with_capacity(n);
	shares.push(P::Scalar::zero()); // placeholder for the correction share
	let mut sum = P::Scalar::zero();
	for _ in 1..n {
		let share = sampler.sample::<P>();
		sum = sum + share.clone();
		shares.push(share);
	}
	shares[0] = x.clone() - sum;
	shares
}

/// Shamir split: a degree-(t-1) polynomial with constant term x, evaluated
/// at each party identifier. Returns the shares and the coefficients.
fn share_threshold<P: ECPoint>(
	x: &P::Scalar,
	threshold: usize,
	pids: &[P::Scalar],
	sampler: &mut Sampler,
) -> (Vec<P::Scalar>, Vec<P::Scalar>) {
	assert!(threshold > 0, "invalid threshold");
	let mut coefficients = Vec::with_capacity(threshold);
	coefficients.push(x.clone());
	for _ in 1..threshold {
		coefficients.push(sampler.sample::<P>());
	}
	let shares = pids
		.iter()
		.map(|pid| {
			assert!(!pid.is_zero(), "party identifier must be non-zero");
			horner_poly(&coefficients, pid)
		})
		.collect();
	(shares, coefficients)
}
