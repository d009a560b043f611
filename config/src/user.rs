use berth_core::ContainerUser;

/// The user the process runs as when neither `--user` nor ids are given:
/// the image's declared user, or root.
pub fn default_user_for_image(image_user: Option<&str>) -> ContainerUser {
    match image_user {
        Some(u) if !u.is_empty() => ContainerUser::raw(u),
        _ => ContainerUser::id(0, 0),
    }
}

/// Resolves the container user from the flag combination.
///
/// Precedence: a non-empty `--user` string, then `--uid`+`--gid`, then the
/// image default; a lone `--uid` becomes a raw user string, and a lone
/// `--gid` keeps the default user but joins the gid as a supplemental
/// group. The second element is the supplemental group list.
pub fn resolve_user(
    user: Option<&str>,
    uid: Option<u32>,
    gid: Option<u32>,
    default_user: &ContainerUser,
) -> (ContainerUser, Vec<u32>) {
    if let Some(u) = user {
        if !u.is_empty() {
            return (ContainerUser::raw(u), Vec::new());
        }
    }
    match (uid, gid) {
        (Some(uid), Some(gid)) => (ContainerUser::id(uid, gid), Vec::new()),
        (None, None) => (default_user.clone(), Vec::new()),
        (Some(uid), None) => (ContainerUser::raw(uid.to_string()), Vec::new()),
        (None, Some(gid)) => (default_user.clone(), vec![gid]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_string_wins() {
        let (user, groups) = resolve_user(
            Some("nobody"),
            Some(1000),
            Some(1000),
            &ContainerUser::id(0, 0),
        );
        assert_eq!(user, ContainerUser::raw("nobody"));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_uid_gid_pair() {
        let (user, groups) = resolve_user(None, Some(1000), Some(2000), &ContainerUser::id(0, 0));
        assert_eq!(user, ContainerUser::id(1000, 2000));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_default_when_nothing_given() {
        let default = ContainerUser::raw("nobody");
        let (user, groups) = resolve_user(None, None, None, &default);
        assert_eq!(user, default);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_lone_uid_becomes_raw_string() {
        let (user, groups) = resolve_user(None, Some(1000), None, &ContainerUser::raw("nobody"));
        assert_eq!(user, ContainerUser::raw("1000"));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_lone_gid_keeps_default_and_supplements() {
        let default = ContainerUser::raw("nobody");
        let (user, groups) = resolve_user(None, None, Some(2000), &default);
        assert_eq!(user, default);
        assert_eq!(groups, vec![2000]);
    }

    #[test]
    fn test_empty_user_string_ignored() {
        let (user, _) = resolve_user(Some(""), Some(5), None, &ContainerUser::id(0, 0));
        assert_eq!(user, ContainerUser::raw("5"));
    }

    #[test]
    fn test_image_default_derivation() {
        assert_eq!(
            default_user_for_image(Some("app")),
            ContainerUser::raw("app")
        );
        assert_eq!(default_user_for_image(Some("")), ContainerUser::id(0, 0));
        assert_eq!(default_user_for_image(None), ContainerUser::id(0, 0));
    }
}
