/// Announcements served when no news file is configured: `(id, title, content)`.
pub const BUILTIN_ITEMS: [(&str, &str, &str); 5] = [
    (
        "1",
        "🚀 PiProtocol Platform Version 2.0 Roadmap",
        "We are proud to announce that version 2.0 of the PiProtocol platform with new \
         features and improved mining performance will be launched on October 6, 2025.",
    ),
    (
        "2",
        "🤝 Strategic Partnership with BlockChain Solutions",
        "We are happy to announce our strategic partnership with BlockChain Solutions for \
         developing secure and scalable infrastructure. This partnership will allow us to \
         provide better services to our users.",
    ),
    (
        "3",
        "📊 PiProtocol Development Roadmap for 2025",
        "The PiProtocol development roadmap for 2025 has been published. In this roadmap, \
         our plans for launching a dedicated wallet, listing PiP token on major blockchain \
         networks, and a staking system with 12% annual interest have been specified.",
    ),
    (
        "4",
        "🏆 Reaching 100,000 Active Users",
        "We are proud to announce that the number of active users of the PiProtocol \
         platform has exceeded 100,000. We thank all users for their trust and support.",
    ),
    (
        "5",
        "💰 Listing PiP Token on Reputable Exchanges",
        "The PiP token will soon be listed on several reputable digital currency exchanges. \
         This action will increase liquidity and accessibility for more users to the PiP token.",
    ),
];
