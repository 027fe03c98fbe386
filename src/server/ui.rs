use axum::extract::State;
use axum::response::Html;

use super::AppState;

/// Controller page: the same page shares and watches.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    controller_page(state.stun_port)
}

pub fn controller_page(stun_port: u16) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Lancast</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #0a0a0a; color: #e0e0e0; line-height: 1.6; }}
        .container {{ max-width: 900px; margin: 0 auto; padding: 40px 20px; }}
        h1 {{ font-size: 2.5em; margin-bottom: 10px; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); -webkit-background-clip: text; -webkit-text-fill-color: transparent; }}
        h2 {{ font-size: 1.1em; margin-bottom: 15px; color: #aaa; }}
        .subtitle {{ color: #888; margin-bottom: 40px; }}
        .card {{ background: #1a1a1a; border-radius: 12px; padding: 30px; margin-bottom: 30px; border: 1px solid #2a2a2a; }}
        .row {{ display: flex; justify-content: space-between; align-items: center; margin-bottom: 20px; color: #888; }}
        button {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 12px 30px; border: none; border-radius: 6px; cursor: pointer; font-size: 16px; font-weight: 600; }}
        button:hover {{ transform: translateY(-1px); }}
        video {{ width: 100%; border-radius: 8px; background: #000; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Lancast</h1>
        <p class="subtitle">Share your screen with everyone on this network</p>

        <div class="card">
            <div class="row">
                <span id="status">Connecting...</span>
                <span><span id="userCount">0</span> connected</span>
            </div>
            <button id="shareBtn">Share my screen</button>
        </div>

        <div class="card" id="localWrap" style="display: none;">
            <h2>Your screen</h2>
            <video id="localVideo" autoplay playsinline muted></video>
        </div>

        <div class="card" id="remoteWrap" style="display: none;">
            <h2>Shared screen</h2>
            <video id="remoteVideo" autoplay playsinline></video>
        </div>
    </div>

    <script>
        const STUN_PORT = {stun_port};
        const rtcConfig = STUN_PORT > 0
            ? {{ iceServers: [{{ urls: 'stun:' + location.hostname + ':' + STUN_PORT }}] }}
            : {{ iceServers: [] }};

        let ws = null;
        let myClientId = null;
        let localStream = null;
        let sharing = false;
        let sharerId = null;
        let viewerPc = null;
        const watcherPcs = {{}};

        function setStatus(text) {{
            document.getElementById('status').textContent = text;
        }}

        function send(msg) {{
            if (ws && ws.readyState === WebSocket.OPEN) {{
                ws.send(JSON.stringify(msg));
            }}
        }}

        function connect() {{
            const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
            ws = new WebSocket(scheme + location.host + '/ws');
            ws.onopen = () => setStatus('Connected');
            ws.onclose = () => {{
                setStatus('Disconnected, retrying...');
                setTimeout(connect, 2000);
            }};
            ws.onmessage = (event) => handleMessage(JSON.parse(event.data));
        }}

        async function handleMessage(msg) {{
            switch (msg.type) {{
                case 'client-id':
                    myClientId = msg.data;
                    break;
                case 'user-count':
                    document.getElementById('userCount').textContent = msg.data;
                    break;
                case 'start-sharing':
                    sharerId = msg.from;
                    if (!sharing) {{
                        send({{ type: 'request-watching', targetId: sharerId }});
                    }}
                    break;
                case 'stop-sharing':
                    if (msg.from === sharerId) {{
                        teardownViewer();
                        sharerId = null;
                    }}
                    if (watcherPcs[msg.from]) {{
                        watcherPcs[msg.from].close();
                        delete watcherPcs[msg.from];
                    }}
                    break;
                case 'request-watching':
                    if (sharing && msg.targetId === myClientId) {{
                        await offerTo(msg.from);
                    }}
                    break;
                case 'offer':
                    if (msg.targetId === myClientId) {{
                        await acceptOffer(msg.from, msg.data);
                    }}
                    break;
                case 'answer':
                    if (msg.targetId === myClientId && watcherPcs[msg.from]) {{
                        await watcherPcs[msg.from].setRemoteDescription(msg.data);
                    }}
                    break;
                case 'ice-candidate': {{
                    if (msg.targetId !== myClientId || !msg.data) break;
                    const pc = watcherPcs[msg.from] || (msg.from === sharerId ? viewerPc : null);
                    if (pc) {{
                        await pc.addIceCandidate(msg.data);
                    }}
                    break;
                }}
            }}
        }}

        async function offerTo(watcherId) {{
            const pc = new RTCPeerConnection(rtcConfig);
            watcherPcs[watcherId] = pc;
            localStream.getTracks().forEach((track) => pc.addTrack(track, localStream));
            pc.onicecandidate = (event) => {{
                if (event.candidate) {{
                    send({{ type: 'ice-candidate', data: event.candidate, targetId: watcherId }});
                }}
            }};
            const offer = await pc.createOffer();
            await pc.setLocalDescription(offer);
            send({{ type: 'offer', data: offer, targetId: watcherId }});
        }}

        async function acceptOffer(from, offer) {{
            teardownViewer();
            sharerId = from;
            viewerPc = new RTCPeerConnection(rtcConfig);
            viewerPc.ontrack = (event) => {{
                document.getElementById('remoteVideo').srcObject = event.streams[0];
                document.getElementById('remoteWrap').style.display = 'block';
            }};
            viewerPc.onicecandidate = (event) => {{
                if (event.candidate) {{
                    send({{ type: 'ice-candidate', data: event.candidate, targetId: from }});
                }}
            }};
            await viewerPc.setRemoteDescription(offer);
            const answer = await viewerPc.createAnswer();
            await viewerPc.setLocalDescription(answer);
            send({{ type: 'answer', data: answer, targetId: from }});
        }}

        function teardownViewer() {{
            if (viewerPc) {{
                viewerPc.close();
                viewerPc = null;
            }}
            document.getElementById('remoteVideo').srcObject = null;
            document.getElementById('remoteWrap').style.display = 'none';
        }}

        async function startSharing() {{
            try {{
                localStream = await navigator.mediaDevices.getDisplayMedia({{ video: true, audio: false }});
            }} catch (err) {{
                setStatus('Screen capture refused: ' + err.message);
                return;
            }}
            sharing = true;
            document.getElementById('localVideo').srcObject = localStream;
            document.getElementById('localWrap').style.display = 'block';
            document.getElementById('shareBtn').textContent = 'Stop sharing';
            localStream.getVideoTracks()[0].onended = stopSharing;
            send({{ type: 'start-sharing' }});
        }}

        function stopSharing() {{
            if (!sharing) return;
            sharing = false;
            send({{ type: 'stop-sharing' }});
            for (const id of Object.keys(watcherPcs)) {{
                watcherPcs[id].close();
                delete watcherPcs[id];
            }}
            if (localStream) {{
                localStream.getTracks().forEach((track) => track.stop());
                localStream = null;
            }}
            document.getElementById('localVideo').srcObject = null;
            document.getElementById('localWrap').style.display = 'none';
            document.getElementById('shareBtn').textContent = 'Share my screen';
        }}

        document.getElementById('shareBtn').addEventListener('click', () => {{
            if (sharing) {{
                stopSharing();
            }} else {{
                startSharing();
            }}
        }});

        connect();
    </script>
</body>
</html>"#,
        stun_port = stun_port
    );

    Html(html)
}
