//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use rpc::connect::channel::ChannelError;
use rpc::connect::create_server;
use rpc::connect::session::{ActiveSession, Gathered, PassiveSession, PeerTarget};
use rpc::proto::Message;
use rpc::rpc::vlr::{During, Phase, Role, StepError, TrainingError};

const PARTIES: usize = 3;

#[tokio::test]
async fn party_index_follows_connection_order() {
    let listener = create_server::bind("127.0.0.1:0", PARTIES).await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    // parties connect one after the other, each announcing its own id
    let clients = tokio::spawn(async move {
        let mut sessions = Vec::new();
        for id in 0..PARTIES {
            let mut s = PassiveSession::connect(&addr, 64).await.unwrap();
            s.send_to_active(&Message::PartialScore(vec![id as f64]))
                .await
                .unwrap();
            sessions.push(s);
        }
        sessions
    });

    let mut active = create_server::accept_parties(&listener, PARTIES, 64)
        .await
        .unwrap();
    let mut passive = clients.await.unwrap();
    assert_eq!(active.party_count(), PARTIES);

    let ids = active
        .receive_from_peer(PeerTarget::All)
        .await
        .unwrap()
        .into_vec();
    let expected = (0..PARTIES)
        .map(|id| Message::PartialScore(vec![id as f64]))
        .collect::<Vec<_>>();
    assert_eq!(ids, expected);

    // the same order holds for later rounds and for single addressing
    for round in 0..3 {
        for id in (0..PARTIES).rev() {
            let tag = (round * 10 + id) as f64;
            active
                .send_to_peer(PeerTarget::Index(id), &Message::BlindedStep(vec![tag]))
                .await
                .unwrap();
            let got = passive[id].receive_from_active().await.unwrap();
            assert_eq!(got, Message::BlindedStep(vec![tag]));

            passive[id]
                .send_to_active(&Message::MaskedWeights(vec![tag]))
                .await
                .unwrap();
            assert_eq!(
                active.receive_from_peer(PeerTarget::Index(id)).await.unwrap(),
                Gathered::One(Message::MaskedWeights(vec![tag]))
            );
        }
    }
}

#[tokio::test]
async fn listener_failure_is_a_setup_error() {
    let r = ActiveSession::listen("no port here", 1, 64)
        .await
        .during(Role::Active, Phase::Setup);
    assert!(matches!(
        r,
        Err(TrainingError::Round {
            role: Role::Active,
            phase: Phase::Setup,
            source: StepError::Channel(ChannelError::Io(_)),
        })
    ));
}
