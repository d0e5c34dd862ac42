//! Crash/recovery behavior in a running cluster.

use std::time::Duration;

use caucus_election::Role;

use crate::cluster::TestCluster;

fn secs(amount: u64) -> Duration {
    Duration::from_secs(amount)
}

#[tokio::test(start_paused = true)]
async fn test_crashed_follower_rejoins_cleanly() {
    let cluster = TestCluster::start(3, 3);
    let leader = cluster
        .wait_for_single_leader(secs(20))
        .await
        .expect("initial leader");
    let follower = (0..3)
        .find(|&id| id != leader.get())
        .expect("two followers exist");

    cluster.crash(follower);
    // Heartbeats keep flowing while the node is down; all of them are
    // dropped, not queued.
    cluster.settle(secs(3)).await;
    cluster.recover(follower);

    assert_eq!(cluster.role_of(follower), Some(Role::Follower));

    // The dropped traffic left no trace: the incumbent still leads and the
    // recovered node follows it.
    cluster.settle(secs(5)).await;
    assert_eq!(cluster.working_leaders(), vec![leader]);
    assert_eq!(cluster.role_of(follower), Some(Role::Follower));
}

#[tokio::test(start_paused = true)]
async fn test_fault_operations_are_idempotent() {
    let cluster = TestCluster::start(3, 9);
    cluster
        .wait_for_single_leader(secs(20))
        .await
        .expect("initial leader");

    cluster.crash(2);
    cluster.crash(2);
    assert_eq!(cluster.role_of(2), None);

    cluster.recover(2);
    cluster.recover(2);
    assert_eq!(cluster.role_of(2), Some(Role::Follower));
}

#[tokio::test(start_paused = true)]
async fn test_single_working_leader_through_fault_sequence() {
    let cluster = TestCluster::start(5, 13);
    let first = cluster
        .wait_for_single_leader(secs(20))
        .await
        .expect("initial leader");

    // Crash the leader twice in a row; five nodes tolerate two failures.
    let mut crashed = Vec::new();
    let mut leader = first;
    for _ in 0..2 {
        cluster.crash(leader.get());
        crashed.push(leader);
        let old = leader;
        let converged = cluster
            .wait_until(secs(12), |c| {
                let leaders = c.working_leaders();
                // Never two working leaders, even mid-election.
                assert!(leaders.len() <= 1, "multiple working leaders observed");
                leaders.len() == 1 && leaders[0] != old
            })
            .await;
        assert!(converged, "re-election after leader crash");
        leader = cluster.working_leaders()[0];
    }

    // Recovering an old leader must not disturb the incumbent.
    let recovered = crashed[0];
    cluster.recover(recovered.get());
    cluster.settle(secs(10)).await;
    assert_eq!(cluster.working_leaders(), vec![leader]);
    assert_eq!(cluster.role_of(recovered.get()), Some(Role::Follower));

    // And the refreshed cluster survives one more failover.
    cluster.crash(leader.get());
    let old = leader;
    let converged = cluster
        .wait_until(secs(12), |c| {
            let leaders = c.working_leaders();
            assert!(leaders.len() <= 1, "multiple working leaders observed");
            leaders.len() == 1 && leaders[0] != old
        })
        .await;
    assert!(converged, "re-election after the final crash");
}
