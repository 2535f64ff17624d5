use std::collections::HashSet;
use std::cmp::{Ord,Ordering};
use std::hash::Hash;

use std::fmt::{Formatter,Debug,Result};

/// Trait bound for Cluster categories (labels). Categories are cloned when
/// reported back to callers, so string labels are permitted alongside the
/// integer categories the engine uses internally.
pub trait Label : Clone + Hash + Ord + PartialEq + Eq + Debug {}

/// Blanket duck-type implementation of Label
impl<T: Clone + Hash + Ord + PartialEq + Eq + Debug> Label for T {}

/// Trait bound for Cluster members, which must be cheap to copy.
/// Typically members are integer ids indexing a point arena held elsewhere.
pub trait Member : Copy + Hash + Ord + PartialEq + Eq + Debug {}

/// Blanket duck-type implementation of Member
impl<T: Copy + Hash + Ord + PartialEq + Eq + Debug> Member for T {}

/// Groups zero or more members into a category as part of a Clustering.
///
///   - C : Type of the Cluster Category.
///   - M : Type of the Cluster Members.
#[derive(Clone)]
pub struct Cluster<C : Label, M : Member>
{
    /// Category for the cluster.
    category : C,

    /// Members of the Cluster.
    members : HashSet<M>
}

impl<C : Label, M : Member> Cluster<C, M> {
    /// Create an empty cluster.
    pub fn empty(category : C) -> Self {
        Cluster { category, members : HashSet::new() }
    }

    /// Create a cluster containing a single member.
    pub fn with_member(category : C, member : M) -> Self {
        let mut cluster = Cluster { category, members : HashSet::new() };
        cluster.members.insert(member);
        cluster
    }

    /// Count of members in the cluster
    pub fn len(&self) -> usize { self.members.len() }

    /// Is the `Cluster` empty?
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Get the Cluster category.
    pub fn get_category(&self) -> C { self.category.clone() }

    /// Get the members of the cluster.
    pub fn get_members(&self) -> &HashSet<M> { &self.members }

    /// Get the members of the cluster in ascending order.
    ///
    /// Iteration over a HashSet varies from run to run; phases of the engine
    /// that must behave reproducibly walk members in this order instead.
    pub fn get_members_sorted(&self) -> Vec<M> {
        let mut members : Vec<M> = self.members.iter().copied().collect();
        members.sort();
        members
    }

    /// Determines if the given item is a member of the cluster.
    pub fn is_member(&self, item : &M) -> bool { self.members.contains(item) }

    /// Adds a new member to the cluster.
    ///   - returns true if a new item was added,
    ///   - returns false if the item was already present in the Cluster.
    pub fn add_member(&mut self, item : M) -> bool { self.members.insert(item) }

    /// Removes a member from the cluster.
    ///   - returns true item was removed,
    ///   - returns false if the item is not present in the Cluster.
    pub fn remove_member(&mut self, item : &M) -> bool { self.members.remove(item) }

    /// Merge two clusters, removing all members from the second and inserting them into the first.
    pub fn merge(&mut self, other : &mut Self) {
        self.members.extend(other.members.iter());
        other.members.clear();
    }
}

impl<C : Label, M : Member> Debug for Cluster<C, M> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let member_string_list : Vec<String> = self.get_members_sorted().iter().map(|m| format!("{:?}", m)).collect();
        write!(f, "Cluster for category '{:?}' has {} members: {}", self.category, self.members.len(), member_string_list.join(","))
    }
}

impl<C : Label, M : Member> PartialEq for Cluster<C, M> {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.members.len() == other.members.len()
    }
}

impl<C : Label, M : Member> Eq for Cluster<C, M> {}

impl<C : Label, M : Member> Ord for Cluster<C, M> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Multi-column sort by category, then member count.
        (&self.category, self.members.len()).cmp(&(&other.category, other.members.len()))
    }
}

impl<C : Label, M : Member> PartialOrd for Cluster<C, M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
