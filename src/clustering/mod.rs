use std::collections::{HashMap};
use std::fmt::{Formatter,Debug};
use std::ops::Range;
use std::usize;
pub mod cluster;
pub mod bcubed;
pub mod msb;
pub mod logarithm;
pub mod counter;
pub mod neighbors;
pub mod classifier;
pub mod density;
pub mod optimal_index;
pub mod tendency;
pub mod closest;

use self::cluster::{Cluster, Label, Member};

/// Partitions items into one or more non-overlapping Clusters.
/// Each item may belong to a single Cluster.
///
/// Two maps are maintained and always agree: a forward map from category to
/// Cluster and a reverse map from member to its current category. Clusters may
/// be combined using the `merge` and `merge_categories` methods.
pub struct Clustering<C : Label, M : Member, G : Iterator<Item = C>> {
    /// Associates each member with the category of the Cluster of which it is currently a member.
    member_to_cluster : HashMap<M,C>,

    /// Associates each category with the Cluster that holds all items that belong to that category.
    clusters : HashMap<C, Cluster<C,M>>,

    /// Callback to generate new Cluster categories.
    ///
    /// Typically this is an auto-incrementing integer function.
    category_generator : G
}

impl<C : Label, M : Member, G : Iterator<Item = C>> Clustering<C, M, G> {
    /// Create an empty Clustering.
    pub fn empty(category_generator : G) -> Self {
        Clustering {
            member_to_cluster : HashMap::new(),
            clusters : HashMap::new(),
            category_generator
        }
    }

    /// Create a Clustering with many items, each a member of its own Cluster.
    pub fn uncategorized<I : Iterator<Item = M>>(items : &mut I, category_generator : G) -> Self {
        let mut clustering = Clustering::empty(category_generator);
        for member in items {
            clustering.add_to_new_cluster(member).expect(&format!("Unable to add item {:?} to new cluster", member));
        }
        clustering
    }

    /// Create a new `Cluster` in the `Clustering` and add the given item to it.
    ///
    ///   - returns - An `Ok` containing the category of the new `Cluster`
    ///     if the item was not previously present in the `Clustering` and was able to be added to a new `Cluster`,
    ///   - returns - An `Err` containing the category of the existing `Cluster` if the item is already clustered
    ///   - panics - If unable to generate any new categories.
    pub fn add_to_new_cluster(&mut self, item : M) -> Result<C,C> {
        match self.get_category(item) {
            Some(current_category) => Err(current_category),
            None => {
                let category = self.next_category();
                let cluster = Cluster::with_member(category.clone(), item);
                self.clusters.insert(category.clone(), cluster);
                self.member_to_cluster.insert(item, category.clone());
                Ok(category)
            }
        }
    }

    /// Create a new, empty `Cluster` and return its category.
    ///
    /// The density splitter carves new clusters out of old ones by creating an
    /// empty category and then moving members into it one by one.
    pub fn create_category(&mut self) -> C {
        let category = self.next_category();
        self.clusters.insert(category.clone(), Cluster::empty(category.clone()));
        category
    }

    fn next_category(&mut self) -> C {
        match self.category_generator.next() {
            Some(category) => category,
            None => panic!("category_generator ran out of new categories")
        }
    }

    /// Add the given not-yet-clustered item to the existing `Cluster` for the given category.
    ///
    ///   - returns - An `Ok` containing the given category
    ///     if the item was not previously present in the `Clustering` and was able to be added to the `Cluster`,
    ///   - returns - An `Err` containing the category of the existing `Cluster` if the item is already clustered
    ///   - panics - If there is no such category in the Clustering.
    pub fn add_to_cluster(&mut self, item : M, category : C) -> Result<C,C> {
        match self.get_category(item) {
            Some(current_category) => Err(current_category),
            None => {
                match self.clusters.get_mut(&category) {
                    Some(cluster) => {
                        cluster.add_member(item);
                        self.member_to_cluster.insert(item, category.clone());
                        Ok(category)
                    },
                    None => panic!("get_category inconsistent with clusters")
                }
            }
        }
    }

    /// Merge the `Cluster` holding item1 with the `Cluster` holding item2.
    ///
    /// The merge is _transitive_; all members affiliated with item1 will now be in the same cluster as all members affiliated with item2.
    ///
    ///  1. If the items are already clustered together, no change occurs.
    ///  2. If both items are already present in the `Clustering`, merge together all items from both Clusters into the Cluster holding item1.
    ///  3. If neither item is currently in a Cluster, create a new Cluster and add each.
    ///  4. If one item is in a Cluster and the other is not, add the unclustered item to the Cluster of the other.
    ///  5. Returns:
    ///     - false if the items are already clustered together
    ///     - true if the items are not already clustered together
    pub fn merge(&mut self, item1 : M, item2 : M) -> bool {
        let categories = (self.get_category(item1), self.get_category(item2));
        match categories {
            (Some(category1), Some(category2)) => {
                if category1 == category2 { return false; }
                self.merge_categories(&category1, &category2);
            },
            (Some(category1), None) => { self.add_to_cluster(item2, category1.clone()).expect(&format!("Unable to add item to category {:?}", category1)); },
            (None, Some(category2)) => { self.add_to_cluster(item1, category2.clone()).expect(&format!("Unable to add item to category {:?}", category2)); },
            (None, None) => {
                let new_category = self.add_to_new_cluster(item1).unwrap();
                let _ = self.add_to_cluster(item2, new_category);
            }
        }
        true
    }

    /// Merge the `Cluster` for the loser category into the `Cluster` for the winner category.
    ///
    /// The winner keeps all members of both; the loser is removed from the `Clustering`.
    ///
    ///   Returns:
    ///     - `true` if both categories exist and are distinct, so a merge took place
    ///     - `false` otherwise
    pub fn merge_categories(&mut self, winner : &C, loser : &C) -> bool {
        if winner == loser { return false; }
        if !self.contains_category(winner) || !self.contains_category(loser) { return false; }
        let loser_members : Vec<M> = {
            let loser_cluster = self.get_cluster(loser).unwrap();
            loser_cluster.get_members().iter().map(|m| *m).collect()
        };
        for member in loser_members.iter() {
            self.member_to_cluster.insert(*member, winner.clone());
        }
        // The borrow checker will not allow updating both clusters in one pass.
        let winner_cluster = self.get_cluster_mut(winner).unwrap();
        for member in loser_members.iter() {
            winner_cluster.add_member(*member);
        }
        self.clusters.remove(loser);
        true
    }

    /// Remove an item from its `Cluster` and from its place in the index for the `Clustering`.
    ///
    /// If the item is the last item in its `Cluster`, that `Cluster` is removed from the `Clustering`.
    ///
    ///   Returns:
    ///     - `true` if able to find the item and remove it
    ///     - `false` if unable to find the item in `Clustering`
    pub fn remove_item(&mut self, item : M) -> bool {
        match self.get_category(item) {
            Some(category) => {
                {
                    let cluster = self.get_cluster_mut(&category).expect(&format!("No Cluster for category {:?}", category));
                    cluster.remove_member(&item);
                    if cluster.is_empty() { self.clusters.remove(&category); }
                }
                self.member_to_cluster.remove(&item).expect(&format!("Member {:?} not in Clustering index", item));
                true
            },
            None => false
        }
    }

    /// Move an item to a different (but existing) category.
    ///
    /// Unlike merge, only the given item is moved; any items with which it had been clustered remain behind in their `Cluster`.
    ///
    ///   1. If `new_category` does not exist in the `Clustering`, return false and do not remove the `item`.
    ///   2. If the item was not previously present in the `Clustering`,
    ///      add it to the `Cluster` for `new_category` and return true.
    ///   3. If the item was already in `new_category`, do nothing and return false.
    ///   4. Otherwise, remove the item from its current category and add it to `new_category`.
    ///
    ///   - Returns true if a change was made, false otherwise.
    pub fn move_item(&mut self, item : M, new_category : &C) -> bool {
        if !self.contains_category(new_category) { return false; }
        match self.get_category(item) {
            Some(ref current_category) if current_category == new_category  => {
                false
            },
            Some(_) => {
                self.remove_item(item);
                self.add_to_cluster(item, new_category.clone()).expect(&format!("Unable to add item to new category {:?}", new_category));
                true
            },
            None => {
                self.add_to_cluster(item, new_category.clone()).expect(&format!("Unable to add item to new category {:?}", new_category));
                true
            }
        }
    }

    /// Check if the Clustering contains the given item in any of its Clusters.
    pub fn contains_item(&self, item : M) -> bool { self.member_to_cluster.contains_key(&item) }

    /// Check if the `Clustering` contains a `Cluster` for the given category.
    pub fn contains_category(&self, category : &C) -> bool { self.clusters.contains_key(category) }

    /// Get the category for the `Cluster` with which the given item is grouped.
    ///
    ///   - returns - Some(category), if the item is clustered.
    ///   - returns - None, if the item is not present in the Clustering.
    pub fn get_category(&self, item : M) -> Option<C> { self.member_to_cluster.get(&item).cloned() }

    /// Get the cluster for the given category.
    ///
    ///   - returns - `Some(Cluster)`, if the category is present in the `Clustering`.
    ///   - returns - `None`, if the category is not present in the `Clustering`.
    pub fn get_cluster(&self, category : &C) -> Option<&Cluster<C,M>> { self.clusters.get(category) }

    /// Get all the `Clusters` in the `Clustering`.
    pub fn get_clusters(&self) -> &HashMap<C,Cluster<C,M>> {
        &self.clusters
    }

    /// Get all categories in ascending order.
    ///
    /// Iterating `get_clusters` directly walks a HashMap, whose order varies
    /// run to run; the merge and split phases use this instead so a rerun over
    /// the same data takes the same decisions.
    pub fn get_categories_sorted(&self) -> Vec<C> {
        let mut categories : Vec<C> = self.clusters.keys().cloned().collect();
        categories.sort();
        categories
    }

    /// Get the cluster for the given category.
    ///
    ///   - returns - `Some(Cluster)`, if the category is present in the `Clustering`.
    ///   - returns - `None`, if the category is not present in the `Clustering`.
    pub fn get_cluster_mut(&mut self, category : &C) -> Option<&mut Cluster<C,M>> { self.clusters.get_mut(category) }

    /// Check if both items are grouped into the same Cluster.
    ///
    ///   - returns - `true`, if both items are present in the Clustering and grouped into the same `Cluster`.
    ///   - returns - `false`, if either item is not present in the `Clustering` or if they are in separate `Clusters`.
    pub fn are_together(&self, item1 : M, item2 : M) -> bool {
        match (self.get_category(item1), self.get_category(item2)) {
            (Some(category1), Some(category2)) => category1 == category2,
            _ => false
        }
    }

    /// Number of Clusters into which items are partitioned
    pub fn cluster_count(&self) -> usize { self.clusters.len() }

    /// Number of members in all the Clusters combined.
    pub fn member_count(&self) -> usize { self.member_to_cluster.len() }
}

/// Create a Clustering where the Cluster categories and Members are usize.
///
/// When the members are usize, it usually means that the real objects being categorized are stored elsewhere,
/// such as in a Vec or HashMap, with the member being the index into that collection.
pub fn integer_clustering() -> Clustering<usize,usize,Range<usize>> {
    Clustering::empty(0..usize::MAX)
}

/// Deserialize a Clustering from a string that has positive integers grouped into clusters
/// using commas to separate numbers within a cluster
/// and semicolons to separate clusters.
///
/// All resulting clusters will be numbered sequentially; the string does not hold cluster ids, just member ids.
///
///   - `clustering_string` - Clusters integers together.
///
/// Example with four clusters:
///
/// ```
///    use slash::clustering::{Clustering,from_delimited_string};
///    let clustering = from_delimited_string("1,2,3;4,5,6;7,8,9;10");
///    assert_eq!(clustering.cluster_count(), 4);
///    assert_eq!(clustering.member_count(), 10);
/// ```
///
/// Panics on bad input.
///
/// NOTE: This method is most useful for assembling test data concisely.
pub fn from_delimited_string(clustering_string : &str) -> Clustering<usize,usize,Range<usize>> {
    let mut clustering = integer_clustering();
    for cluster_string in clustering_string.split(';') {
        let mut cluster_id_opt = None;
        for member_string in cluster_string.split(',') {
            let member = member_string.parse::<usize>().unwrap();
            match cluster_id_opt {
                Some(cluster_id) => { clustering.add_to_cluster(member, cluster_id).expect(&format!("Unable to add {} to cluster {}", member, cluster_id)); },
                None => { cluster_id_opt = Some(clustering.add_to_new_cluster(member).expect(&format!("Unable to add {} to a new cluster", member))); }
            }
        }
    }
    clustering
}

impl<C : Label, M : Member, G : Iterator<Item = C>> Debug for Clustering<C, M, G> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut clusters_formatted = String::new();
        for category in self.get_categories_sorted() {
            clusters_formatted.push_str(&format!("  {:?}\n", self.get_cluster(&category).unwrap()));
        }
        write!(f, "Clustering {} members into {} clusters\n{}", self.member_count(), self.cluster_count(), clusters_formatted)
    }
}


#[cfg(test)]
/// Tests of the Clustering methods.
mod tests {
    #[allow(unused_imports)]
    use spectral::prelude::*;
    use crate::clustering;

    #[test]
    fn from_delimited_string() {
        let clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        assert_eq!(clustering.cluster_count(), 4);
        assert_eq!(clustering.member_count(), 10);
        asserting("Membership").that(&clustering.get_category(4).unwrap()).is_equal_to(1);
    }

    #[test]
    fn are_together() {
        let clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        asserting("Should be together").that(&clustering.are_together(7,9)).is_equal_to(true);
        asserting("Should be apart").that(&clustering.are_together(2,4)).is_equal_to(false);
    }

    #[test]
    fn get_category() {
        let clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        asserting("Membership").that(&clustering.get_category(8).unwrap()).is_equal_to(2);
    }

    #[test]
    fn contains_item() {
        let clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        asserting("Should contain item").that(&clustering.contains_item(8)).is_equal_to(true);
        asserting("Should not contain item").that(&clustering.contains_item(11)).is_equal_to(false);
    }

    #[test]
    fn add_to_new_cluster() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        clustering.add_to_new_cluster(100).expect("Unable to add to new cluster");
        asserting("Should contain item").that(&clustering.contains_item(100)).is_equal_to(true);
        asserting("Membership").that(&clustering.get_category(100).unwrap()).is_equal_to(4);
    }

    #[test]
    fn add_to_cluster() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        clustering.add_to_cluster(100, 1).expect("Unable to add to existing cluster");
        asserting("Should contain item").that(&clustering.contains_item(100)).is_equal_to(true);
        asserting("Membership").that(&clustering.get_category(100).unwrap()).is_equal_to(1);
    }

    #[test]
    fn merge() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        asserting("Should merge").that(&clustering.merge(1, 10)).is_equal_to(true);
        asserting("Should be together").that(&clustering.are_together(2,10)).is_equal_to(true);
        assert_eq!(clustering.cluster_count(), 3);
    }

    #[test]
    fn merge_categories() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        asserting("Should merge").that(&clustering.merge_categories(&0, &2)).is_equal_to(true);
        asserting("Winner keeps the loser's members").that(&clustering.are_together(1, 8)).is_equal_to(true);
        asserting("Loser is gone").that(&clustering.contains_category(&2)).is_equal_to(false);
        assert_eq!(clustering.cluster_count(), 3);
        assert_eq!(clustering.member_count(), 10);
    }

    #[test]
    fn create_category_starts_empty() {
        let mut clustering = clustering::from_delimited_string("1,2;3,4");
        let fresh = clustering.create_category();
        asserting("New category exists").that(&clustering.contains_category(&fresh)).is_equal_to(true);
        assert_eq!(clustering.get_cluster(&fresh).unwrap().len(), 0);
        clustering.move_item(2, &fresh);
        asserting("Moved item changed category").that(&clustering.get_category(2).unwrap()).is_equal_to(fresh);
        assert_eq!(clustering.member_count(), 4);
    }

    #[test]
    fn move_item() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        clustering.move_item(6, &0);
        asserting("Membership changed").that(&clustering.get_category(6).unwrap()).is_equal_to(0);
        asserting("Membership unchanged").that(&clustering.get_category(5).unwrap()).is_equal_to(1);
    }

    /// After any sequence of add, move and merge operations, every member has
    /// exactly one category and the cluster sizes sum to the member count.
    #[test]
    fn partition_remains_well_formed() {
        let mut clustering = clustering::from_delimited_string("1,2,3;4,5,6;7,8,9;10");
        clustering.merge(1, 4);
        clustering.move_item(9, &0);
        clustering.merge_categories(&3, &0);
        clustering.add_to_new_cluster(42).unwrap();
        clustering.move_item(42, &3);
        let total : usize = clustering.get_clusters().values().map(|c| c.len()).sum();
        assert_eq!(total, clustering.member_count());
        for category in clustering.get_categories_sorted() {
            for member in clustering.get_cluster(&category).unwrap().get_members() {
                assert_eq!(clustering.get_category(*member).unwrap(), category);
            }
        }
    }
}
