//! Registry Module Tests
//!
//! Validates the group/member state machine end to end: heartbeat revision
//! assignment, lease filtering, ranked listings, gossip precedence, change-set
//! drain semantics and lease expiry.

#[cfg(test)]
mod tests {
    use crate::gossip::driver::build_entries;
    use crate::gossip::protocol::{GossipEntry, GossipMemberInfo};
    use crate::registry::group::Group;
    use crate::registry::manager::GroupManager;
    use crate::registry::member::Member;
    use crate::registry::types::{now_micros, Attributes, GroupId, MemberId, MemberInfo};
    use std::time::Duration;

    fn member_info(id: &str, priority: i64, attrs: &[(&str, &str)]) -> MemberInfo {
        MemberInfo {
            id: MemberId(id.to_string()),
            priority,
            attributes: attrs
                .iter()
                .map(|(key, value)| (key.to_string(), value.as_bytes().to_vec()))
                .collect(),
        }
    }

    fn gossip_entry(
        group: &str,
        id: &str,
        revision: u64,
        priority: i64,
        lease_deadline: u64,
        attrs: Option<&[(&str, &str)]>,
    ) -> GossipEntry {
        GossipEntry {
            group_id: GroupId(group.to_string()),
            member_info: GossipMemberInfo {
                id: MemberId(id.to_string()),
                priority,
                attributes: attrs.map(|pairs| {
                    pairs
                        .iter()
                        .map(|(key, value)| (key.to_string(), value.as_bytes().to_vec()))
                        .collect::<Attributes>()
                }),
            },
            revision,
            lease_deadline,
        }
    }

    // ============================================================
    // MEMBER TESTS
    // ============================================================

    #[test]
    fn test_heartbeat_bumps_revision() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();

        member.update_from_heartbeat(&member_info("m1", 5, &[]), Duration::from_secs(30), now);
        assert_eq!(member.revision(), 1);
        assert_eq!(member.priority(), 5);

        member.update_from_heartbeat(&member_info("m1", -2, &[]), Duration::from_secs(30), now);
        assert_eq!(member.revision(), 2);
        assert_eq!(member.priority(), -2);
    }

    #[test]
    fn test_heartbeat_empty_attributes_keep_previous() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();

        member.update_from_heartbeat(
            &member_info("m1", 1, &[("host", "h1")]),
            Duration::from_secs(30),
            now,
        );
        assert_eq!(member.attributes().get("host").unwrap(), b"h1");

        // Empty attribute set means "no change".
        member.update_from_heartbeat(&member_info("m1", 1, &[]), Duration::from_secs(30), now);
        assert_eq!(member.attributes().get("host").unwrap(), b"h1");

        // A non-empty set replaces wholesale.
        member.update_from_heartbeat(
            &member_info("m1", 1, &[("zone", "z1")]),
            Duration::from_secs(30),
            now,
        );
        assert!(member.attributes().get("host").is_none());
        assert_eq!(member.attributes().get("zone").unwrap(), b"z1");
    }

    #[test]
    fn test_heartbeat_arms_lease() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();

        member.update_from_heartbeat(&member_info("m1", 0, &[]), Duration::from_secs(30), now);

        assert_eq!(member.lease_deadline(), now + 30_000_000);
        assert_eq!(member.last_heartbeat_at(), now);
        assert!(!member.is_expired(now));
        assert!(member.is_expired(now + 30_000_000));
    }

    #[test]
    fn test_gossip_ignores_stale_revision() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();
        for _ in 0..5 {
            member.update_from_heartbeat(&member_info("m1", 3, &[]), Duration::from_secs(30), now);
        }
        assert_eq!(member.revision(), 5);

        // Same revision: local state wins the tie.
        let stale = gossip_entry("g", "m1", 5, 9, now + 1, None);
        assert!(!member.update_from_gossip(&stale));
        assert_eq!(member.priority(), 3);

        let older = gossip_entry("g", "m1", 4, 9, now + 1, None);
        assert!(!member.update_from_gossip(&older));
        assert_eq!(member.revision(), 5);
    }

    #[test]
    fn test_gossip_adopts_newer_revision() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();
        member.update_from_heartbeat(&member_info("m1", 3, &[]), Duration::from_secs(30), now);

        let entry = gossip_entry("g", "m1", 7, 9, 123_456_789, Some(&[("host", "h2")]));
        assert!(member.update_from_gossip(&entry));

        assert_eq!(member.revision(), 7);
        assert_eq!(member.priority(), 9);
        // The peer-supplied deadline is taken verbatim, not recomputed.
        assert_eq!(member.lease_deadline(), 123_456_789);
        assert_eq!(member.attributes().get("host").unwrap(), b"h2");
    }

    #[test]
    fn test_gossip_without_attributes_keeps_local() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let now = now_micros();
        member.update_from_heartbeat(
            &member_info("m1", 3, &[("host", "h1")]),
            Duration::from_secs(30),
            now,
        );

        let entry = gossip_entry("g", "m1", 9, 4, now + 1_000_000, None);
        assert!(member.update_from_gossip(&entry));

        assert_eq!(member.priority(), 4);
        assert_eq!(member.attributes().get("host").unwrap(), b"h1");
    }

    #[test]
    fn test_gossip_is_idempotent() {
        let mut member = Member::new(GroupId("g".to_string()), MemberId("m1".to_string()));
        let entry = gossip_entry("g", "m1", 3, 7, 42_000_000, Some(&[("host", "h1")]));

        assert!(member.update_from_gossip(&entry));
        let first = member.snapshot();

        assert!(!member.update_from_gossip(&entry));
        let second = member.snapshot();

        assert_eq!(first.revision, second.revision);
        assert_eq!(first.priority, second.priority);
        assert_eq!(first.lease_deadline, second.lease_deadline);
        assert_eq!(first.attributes, second.attributes);
    }

    // ============================================================
    // GROUP TESTS
    // ============================================================

    fn insert_live_member(group: &Group, id: &str, priority: i64, deadline: u64) {
        let mut member = Member::new(group.id().clone(), MemberId(id.to_string()));
        member.update_from_gossip(&gossip_entry(&group.id().0, id, 1, priority, deadline, None));
        group.members.insert(MemberId(id.to_string()), member);
    }

    #[test]
    fn test_list_sorted_by_priority_then_id() {
        let group = Group::new(GroupId("g".to_string()));
        let now = now_micros();
        let live = now + 60_000_000;

        insert_live_member(&group, "b", 5, live);
        insert_live_member(&group, "a", 5, live);
        insert_live_member(&group, "c", 1, live);

        let listed = group.list_members(10, now);
        let ids: Vec<&str> = listed.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_list_respects_limit() {
        let group = Group::new(GroupId("g".to_string()));
        let now = now_micros();
        for i in 0..5 {
            insert_live_member(&group, &format!("m{}", i), i, now + 60_000_000);
        }

        assert_eq!(group.list_members(3, now).len(), 3);
        assert_eq!(group.list_members(0, now).len(), 0);
        assert_eq!(group.list_members(100, now).len(), 5);
    }

    #[test]
    fn test_list_filters_expired() {
        let group = Group::new(GroupId("g".to_string()));
        let now = now_micros();

        insert_live_member(&group, "live", 1, now + 60_000_000);
        insert_live_member(&group, "dead", 0, now - 1);
        insert_live_member(&group, "boundary", 0, now);

        let listed = group.list_members(10, now);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.0, "live");
        assert_eq!(group.member_count(now), 1);
    }

    // ============================================================
    // MANAGER HEARTBEAT TESTS
    // ============================================================

    #[test]
    fn test_single_heartbeat_listing() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(
            &group_id,
            &member_info("m1", 5, &[("host", "h1")]),
            Duration::from_secs(30),
        );

        let group = manager.get_group(&group_id).expect("group should exist");
        let listed = group.list_members(10, now_micros());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.0, "m1");
        assert_eq!(listed[0].priority, 5);
        assert_eq!(listed[0].revision, 1);
        assert_eq!(listed[0].attributes.get("host").unwrap(), b"h1");
        assert_eq!(group.member_count(now_micros()), 1);
    }

    #[test]
    fn test_unknown_group_not_found() {
        let manager = GroupManager::new();
        assert!(manager.get_group(&GroupId("nope".to_string())).is_none());
    }

    #[test]
    fn test_two_groups_isolated() {
        let manager = GroupManager::new();
        let g1 = GroupId("g1".to_string());
        let g2 = GroupId("g2".to_string());

        manager.process_heartbeat(&g1, &member_info("m1", 1, &[]), Duration::from_secs(30));
        manager.process_heartbeat(&g2, &member_info("m1", 2, &[]), Duration::from_secs(30));

        let now = now_micros();
        let listed1 = manager.get_group(&g1).unwrap().list_members(10, now);
        let listed2 = manager.get_group(&g2).unwrap().list_members(10, now);

        assert_eq!(listed1.len(), 1);
        assert_eq!(listed2.len(), 1);
        assert_eq!(listed1[0].priority, 1);
        assert_eq!(listed2[0].priority, 2);
    }

    #[test]
    fn test_revisions_increase_across_heartbeats() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        let mut last_revision = 0;
        for _ in 0..4 {
            manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(30));
            let revision = manager
                .get_group(&group_id)
                .unwrap()
                .list_members(1, now_micros())[0]
                .revision;
            assert!(revision > last_revision);
            last_revision = revision;
        }
        assert_eq!(last_revision, 4);
    }

    #[test]
    fn test_expired_group_not_found() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(10));

        // All members are past deadline, so the group is gone from the
        // client's point of view even before the reaper runs.
        assert!(manager.get_group(&group_id).is_none());
    }

    // ============================================================
    // CHANGE SET TESTS
    // ============================================================

    #[test]
    fn test_drain_returns_modified_once() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(30));

        let drained = manager.drain_modified();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id.0, "m1");

        assert!(manager.drain_modified().is_empty());
    }

    #[test]
    fn test_drain_coalesces_mutations() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(30));
        manager.process_heartbeat(&group_id, &member_info("m1", 2, &[]), Duration::from_secs(30));

        let drained = manager.drain_modified();
        assert_eq!(drained.len(), 1);
        // Coalesced entries carry the latest snapshot.
        assert_eq!(drained[0].revision, 2);
        assert_eq!(drained[0].priority, 2);
    }

    #[test]
    fn test_remutation_reappears_after_drain() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(30));
        assert_eq!(manager.drain_modified().len(), 1);

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(30));
        let drained = manager.drain_modified();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].revision, 2);
    }

    #[test]
    fn test_drain_skips_expired() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(10));

        // Tombstones travel by absence: an expired member is simply not
        // gossiped, and peers purge it at the same deadline on their own.
        assert!(manager.drain_modified().is_empty());
    }

    #[test]
    fn test_gossip_mutation_joins_change_set() {
        let manager = GroupManager::new();
        let deadline = now_micros() + 60_000_000;
        let entry = gossip_entry("g", "m1", 3, 1, deadline, None);

        manager.process_gossip(std::slice::from_ref(&entry));
        assert_eq!(manager.drain_modified().len(), 1);

        // Re-applying the same entry mutates nothing and queues nothing.
        manager.process_gossip(std::slice::from_ref(&entry));
        assert!(manager.drain_modified().is_empty());
    }

    // ============================================================
    // EXPIRY TESTS
    // ============================================================

    #[test]
    fn test_sweep_removes_expired_member_and_group() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(10));

        let removed = manager.sweep_expired(now_micros());
        assert_eq!(removed, 1);
        assert!(manager.get_group(&group_id).is_none());
        assert!(manager.introspection_view(now_micros()).is_empty());
        assert_eq!(manager.group_count(now_micros()), 0);
    }

    #[test]
    fn test_sweep_keeps_extended_lease() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_millis(2));
        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_secs(10));
        std::thread::sleep(Duration::from_millis(10));

        // The stale deadline from the first heartbeat is due, but the member
        // was re-armed; the sweep must not remove it.
        let removed = manager.sweep_expired(now_micros());
        assert_eq!(removed, 0);
        assert_eq!(manager.member_count(now_micros()), 1);
    }

    #[test]
    fn test_heartbeat_after_expiry_recreates() {
        let manager = GroupManager::new();
        let group_id = GroupId("g".to_string());

        manager.process_heartbeat(&group_id, &member_info("m1", 1, &[]), Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(10));
        manager.sweep_expired(now_micros());

        manager.process_heartbeat(&group_id, &member_info("m1", 7, &[]), Duration::from_secs(30));
        let listed = manager
            .get_group(&group_id)
            .unwrap()
            .list_members(10, now_micros());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].priority, 7);
        // A recreated member starts a fresh revision sequence.
        assert_eq!(listed[0].revision, 1);
    }

    // ============================================================
    // CONVERGENCE TESTS
    // ============================================================

    #[test]
    fn test_gossip_roundtrip_converges() {
        let server_a = GroupManager::new();
        let server_b = GroupManager::new();
        let group_id = GroupId("g".to_string());

        server_a.process_heartbeat(
            &group_id,
            &member_info("m1", 5, &[("host", "h1")]),
            Duration::from_secs(30),
        );
        server_a.process_heartbeat(
            &group_id,
            &member_info("m2", 3, &[("host", "h2")]),
            Duration::from_secs(30),
        );

        let drained = server_a.drain_modified();
        let entries = build_entries(&drained, now_micros(), Duration::ZERO);
        server_b.process_gossip(&entries);

        let now = now_micros();
        let view_a = server_a.introspection_view(now);
        let view_b = server_b.introspection_view(now);
        assert_eq!(view_a.len(), view_b.len());
        for ((gid_a, members_a), (gid_b, members_b)) in view_a.iter().zip(view_b.iter()) {
            assert_eq!(gid_a, gid_b);
            assert_eq!(members_a.len(), members_b.len());
            for (a, b) in members_a.iter().zip(members_b.iter()) {
                assert_eq!(a.id, b.id);
                assert_eq!(a.priority, b.priority);
                assert_eq!(a.revision, b.revision);
                assert_eq!(a.lease_deadline, b.lease_deadline);
                assert_eq!(a.attributes, b.attributes);
            }
        }
    }

    #[test]
    fn test_revision_conflict_resolution() {
        let server_a = GroupManager::new();
        let server_b = GroupManager::new();
        let group_id = GroupId("g".to_string());

        // B independently learned an older incarnation of m1.
        let deadline = now_micros() + 60_000_000;
        server_b.process_gossip(&[gossip_entry("g", "m1", 5, 9, deadline, None)]);

        // A, the home server, advanced m1 to revision 7 with priority 3.
        for _ in 0..7 {
            server_a.process_heartbeat(&group_id, &member_info("m1", 3, &[]), Duration::from_secs(60));
        }

        let drained = server_a.drain_modified();
        let entries = build_entries(&drained, now_micros(), Duration::ZERO);
        server_b.process_gossip(&entries);

        let listed = server_b
            .get_group(&group_id)
            .unwrap()
            .list_members(10, now_micros());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].revision, 7);
        assert_eq!(listed[0].priority, 3);
    }
}
